use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Wrap input text into display rows of at most `width` columns, honoring
/// explicit newlines and never splitting inside a wide character.
pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines: Vec<String> = vec![String::new()];
    let mut current_width = 0usize;

    for ch in input.chars() {
        match ch {
            '\r' => {}
            '\n' => {
                lines.push(String::new());
                current_width = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if current_width + ch_width > width && current_width > 0 {
                    lines.push(String::new());
                    current_width = 0;
                }
                lines
                    .last_mut()
                    .expect("lines is never empty")
                    .push(ch);
                current_width += ch_width;
            }
        }
    }
    lines
}

/// Visual (row, column) of a byte cursor under the same wrapping rules as
/// [`wrap_input_lines`].
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);
    let mut row = 0usize;
    let mut col = 0usize;

    for (idx, ch) in input.char_indices() {
        if idx >= cursor_byte {
            break;
        }
        match ch {
            '\r' => {}
            '\n' => {
                row += 1;
                col = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if col + ch_width > width && col > 0 {
                    row += 1;
                    col = 0;
                }
                col += ch_width;
            }
        }
    }

    if col >= width {
        row += 1;
        col = 0;
    }
    (row, col)
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width && used > 0 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_honors_width_and_newlines() {
        let lines = wrap_input_lines("hello\nworld wide", 6);
        assert_eq!(lines, vec!["hello", "world ", "wide"]);
    }

    #[test]
    fn test_cursor_position_tracks_wrapping() {
        assert_eq!(cursor_row_col("hello world", 8, 6), (1, 2));
        assert_eq!(cursor_row_col("ab\ncd", 4, 10), (1, 1));
    }

    #[test]
    fn test_clamp_handles_multibyte_boundaries() {
        let input = "héllo";
        // byte 2 is inside the two-byte 'é'
        assert_eq!(clamp_to_char_boundary_left(input, 2), 1);
        assert_eq!(clamp_to_char_boundary_left(input, 99), input.len());
    }
}
