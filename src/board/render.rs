use super::{codec::StoneColor, snapshot::BoardSnapshot};
use crate::constants::{BOARD_WIDTH, STAR_POINTS};

/// Plain-text grid: `X` black, `O` white, `+` star point, `.` empty.
pub fn render_text(snapshot: &BoardSnapshot) -> String {
    let mut out = String::with_capacity((BOARD_WIDTH * 2 + 4) * (BOARD_WIDTH + 1));
    out.push_str("   ");
    for x in 0..BOARD_WIDTH {
        out.push_str(&format!("{:2}", x));
    }
    out.push('\n');

    for y in 0..BOARD_WIDTH {
        out.push_str(&format!("{:2} ", y));
        for x in 0..BOARD_WIDTH {
            let glyph = match snapshot.stone_at(x, y) {
                Some(StoneColor::Black) => 'X',
                Some(StoneColor::White) => 'O',
                None if STAR_POINTS.contains(&x) && STAR_POINTS.contains(&y) => '+',
                None => '.',
            };
            out.push(' ');
            out.push(glyph);
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "captures: black {} / white {}\n",
        snapshot.captured_black, snapshot.captured_white
    ));
    if snapshot.black_passed_once {
        out.push_str("black passed\n");
    }
    if snapshot.white_passed_once {
        out.push_str("white passed\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::snapshot::{empty_states, sample_scalars};
    use ethers::types::Address;

    #[test]
    fn renders_stones_and_star_points() {
        let mut states = empty_states();
        states[0] = 1;
        states[1] = 2;
        let snapshot =
            BoardSnapshot::from_reads(Address::zero(), sample_scalars(Address::zero()), &states).unwrap();
        let text = render_text(&snapshot);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), BOARD_WIDTH + 2);
        assert!(lines[1].starts_with(" 0  X O ."));
        assert_eq!(lines[4].chars().filter(|c| *c == '+').count(), 3);
        assert!(text.contains("captures: black 0 / white 0"));
        assert!(!text.contains("passed"));
    }
}
