//! # Component System
//!
//! Components are plain data owned by exactly one entity. Any `Debug` type
//! can be a component once it opts in through [`Component`] and is
//! registered with a world.

use std::fmt;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Debug`: used for the textual component dumps
/// - `'static`: stores are keyed by type identity
///
/// # Example
///
/// ```rust
/// use mengine_core::Component;
///
/// #[derive(Debug)]
/// struct Player {
///     x: i32,
///     y: i32,
/// }
///
/// impl Component for Player {}
/// ```
pub trait Component: fmt::Debug + 'static {}

/// Renders a component value as a compact, single-line dump.
///
/// Struct names are dropped and field separators tightened, so
/// `Player { x: 200, y: 400 }` renders as `{x:200 y:400}`. String contents
/// are copied verbatim.
#[must_use]
pub fn render_compact<C: fmt::Debug + ?Sized>(value: &C) -> String {
    compact_debug(&format!("{value:?}"))
}

fn compact_debug(debug: &str) -> String {
    let mut out = String::with_capacity(debug.len());
    let mut chars = debug.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                strip_type_name(&mut out);
                out.push('{');
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            ' ' if chars.peek() == Some(&'}') => {}
            ':' | ',' if chars.peek() == Some(&' ') => {
                out.push(if c == ':' { ':' } else { ' ' });
                chars.next();
            }
            _ => out.push(c),
        }
    }

    out
}

/// Drops a `TypeName ` prefix that precedes an opening brace.
fn strip_type_name(out: &mut String) {
    if !out.ends_with(' ') {
        return;
    }
    let without_space = out.trim_end_matches(' ');
    let without_name =
        without_space.trim_end_matches(|c: char| c.is_alphanumeric() || c == '_');
    if without_name.len() < without_space.len() {
        out.truncate(without_name.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Player {
        x: i32,
        y: i32,
    }

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Vec2 {
        x: f32,
        y: f32,
    }

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Transform {
        position: Vec2,
        rotation: f32,
    }

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Label {
        text: String,
    }

    #[test]
    fn test_flat_struct() {
        assert_eq!(render_compact(&Player { x: 200, y: 400 }), "{x:200 y:400}");
    }

    #[test]
    fn test_nested_struct() {
        let t = Transform {
            position: Vec2 { x: 1.5, y: 2.0 },
            rotation: 0.5,
        };
        assert_eq!(render_compact(&t), "{position:{x:1.5 y:2.0} rotation:0.5}");
    }

    #[test]
    fn test_string_contents_untouched() {
        let label = Label {
            text: "a, b: { c }".to_string(),
        };
        assert_eq!(render_compact(&label), "{text:\"a, b: { c }\"}");
    }

    #[test]
    fn test_non_struct_values() {
        assert_eq!(render_compact(&42_u32), "42");
        assert_eq!(render_compact(&(1, 2)), "(1 2)");
    }
}
