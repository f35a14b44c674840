//! Board diagrams as standalone SVG documents.

use std::fmt::Write;

use shakmaty::{Chess, Color, File, Move, Piece, Position, Rank, Role, Square};

const LIGHT_SQUARE: &str = "#f0d9b5";
const DARK_SQUARE: &str = "#b58863";
const LIGHT_LASTMOVE: &str = "#cdd16a";
const DARK_LASTMOVE: &str = "#aaa23b";
const TITLE_BAND: &str = "#302e2b";

/// Height of the title band above the board, in pixels.
pub const TITLE_HEIGHT: u32 = 40;

/// A titled board picture.
#[derive(Debug, Clone)]
pub struct Diagram<'a> {
    pub position: &'a Chess,
    pub title: &'a str,
    /// Side shown at the bottom.
    pub orientation: Color,
    /// Move to highlight.
    pub last_move: Option<&'a Move>,
    /// Board edge in pixels.
    pub size: u32,
}

impl Diagram<'_> {
    /// Render the diagram; the document is `size` wide and
    /// `size + TITLE_HEIGHT` tall.
    pub fn render(&self) -> String {
        let size = self.size;
        let square = size as f64 / 8.0;
        let mut svg = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(
            svg,
            r#"<svg width="{size}" height="{height}" viewBox="0 0 {size} {height}" xmlns="http://www.w3.org/2000/svg">"#,
            height = size + TITLE_HEIGHT
        );
        let _ = writeln!(
            svg,
            r#"  <rect x="0" y="0" width="{size}" height="{TITLE_HEIGHT}" fill="{TITLE_BAND}"/>"#
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{x}" y="25" text-anchor="middle" font-size="18" font-family="Arial, sans-serif" fill="white" font-weight="bold">{title}</text>"#,
            x = size / 2,
            title = escape(self.title)
        );
        let _ = writeln!(svg, r#"  <g transform="translate(0,{TITLE_HEIGHT})">"#);

        let highlighted = self.highlighted();
        for row in 0..8u32 {
            for col in 0..8u32 {
                let sq = self.square_at(row, col);
                let light = (row + col) % 2 == 0;
                let fill = match (highlighted.contains(&Some(sq)), light) {
                    (true, true) => LIGHT_LASTMOVE,
                    (true, false) => DARK_LASTMOVE,
                    (false, true) => LIGHT_SQUARE,
                    (false, false) => DARK_SQUARE,
                };
                let (x, y) = (col as f64 * square, row as f64 * square);
                let _ = writeln!(
                    svg,
                    r#"    <rect x="{x}" y="{y}" width="{square}" height="{square}" fill="{fill}"/>"#
                );
                if let Some(piece) = self.position.board().piece_at(sq) {
                    let _ = writeln!(
                        svg,
                        r#"    <text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="central" font-size="{fs}" fill="{fill}" stroke="{stroke}">{glyph}</text>"#,
                        cx = x + square / 2.0,
                        cy = y + square / 2.0,
                        fs = square * 0.8,
                        fill = piece_colors(piece).0,
                        stroke = piece_colors(piece).1,
                        glyph = glyph(piece),
                    );
                }
            }
        }

        self.write_coordinates(&mut svg, square);
        svg.push_str("  </g>\n</svg>\n");
        svg
    }

    /// Board square drawn at screen `row`/`col`, both counted from the top left.
    fn square_at(&self, row: u32, col: u32) -> Square {
        let (file, rank) = match self.orientation {
            Color::White => (col, 7 - row),
            Color::Black => (7 - col, row),
        };
        Square::from_coords(File::new(file), Rank::new(rank))
    }

    fn highlighted(&self) -> [Option<Square>; 2] {
        match self.last_move {
            Some(mv) => [mv.from(), Some(mv.to())],
            None => [None, None],
        }
    }

    fn write_coordinates(&self, svg: &mut String, square: f64) {
        let font = square * 0.2;
        for i in 0..8u32 {
            let (file, rank) = match self.orientation {
                Color::White => (i, 7 - i),
                Color::Black => (7 - i, i),
            };
            let file_label = char::from(b'a' + file as u8);
            let rank_label = rank + 1;
            let _ = writeln!(
                svg,
                r#"    <text x="{x}" y="{y}" font-size="{font}" font-family="Arial, sans-serif" fill="{fill}">{file_label}</text>"#,
                x = (i as f64 + 1.0) * square - font,
                y = 8.0 * square - font * 0.4,
                fill = if i % 2 == 0 { LIGHT_SQUARE } else { DARK_SQUARE },
            );
            let _ = writeln!(
                svg,
                r#"    <text x="{x}" y="{y}" font-size="{font}" font-family="Arial, sans-serif" fill="{fill}">{rank_label}</text>"#,
                x = font * 0.4,
                y = i as f64 * square + font * 1.2,
                fill = if i % 2 == 0 { DARK_SQUARE } else { LIGHT_SQUARE },
            );
        }
    }
}

fn glyph(piece: Piece) -> char {
    match piece.role {
        Role::King => '\u{265A}',
        Role::Queen => '\u{265B}',
        Role::Rook => '\u{265C}',
        Role::Bishop => '\u{265D}',
        Role::Knight => '\u{265E}',
        Role::Pawn => '\u{265F}',
    }
}

/// Fill and stroke; white pieces are outlined so they show on light squares.
fn piece_colors(piece: Piece) -> (&'static str, &'static str) {
    match piece.color {
        Color::White => ("#ffffff", "#000000"),
        Color::Black => ("#000000", "none"),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
