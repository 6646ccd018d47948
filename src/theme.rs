use anstyle::{AnsiColor, Color, Style};

pub const HEADING: Style = Style::new().bold().underline();
pub const COMMAND: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
pub const ALIAS: Style = Style::new().dimmed();
pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
