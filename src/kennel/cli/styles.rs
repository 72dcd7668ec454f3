use console::Style;
use once_cell::sync::Lazy;

pub static HEADER: Lazy<Style> = Lazy::new(|| Style::new().bold().underlined());
pub static ITEM_ID: Lazy<Style> = Lazy::new(|| Style::new().yellow());
pub static ITEM_NAME: Lazy<Style> = Lazy::new(|| Style::new().bold());
pub static MUTED: Lazy<Style> = Lazy::new(|| Style::new().color256(246).italic());
pub static PROMPT: Lazy<Style> = Lazy::new(|| Style::new().cyan().bold());
pub static DANGER: Lazy<Style> = Lazy::new(|| Style::new().red().bold());

/// Style for a lifecycle bucket label.
pub fn status_style(status: &str) -> &'static Style {
    static BREEDING: Lazy<Style> = Lazy::new(|| Style::new().green());
    static PUPPY: Lazy<Style> = Lazy::new(|| Style::new().cyan());
    static GRADUATE: Lazy<Style> = Lazy::new(|| Style::new().blue());
    static MEMORIAL: Lazy<Style> = Lazy::new(|| Style::new().color256(246));
    match status {
        "breeding" => &*BREEDING,
        "puppy" => &*PUPPY,
        "graduate" => &*GRADUATE,
        _ => &*MEMORIAL,
    }
}
