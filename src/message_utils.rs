use crate::constants::{self, DESCRIPTION_MAX_LENGTH};
use poise::{
    serenity_prelude::{CreateEmbed, EMBED_MAX_LENGTH},
    CreateReply,
};
use std::mem;

pub fn success_embed(content: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .description(content)
        .color(constants::SUCCESS_COLOR)
}

pub fn failure_embed(content: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .description(content)
        .color(constants::FAILURE_COLOR)
}

pub fn info_embed(content: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .description(content)
        .color(constants::INFO_COLOR)
}

pub fn success_message(content: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(success_embed(content))
}

/// Renders a list into one or two embeds, dropping the longest lines past Discord limits.
pub fn render_lines_reply<S: Into<String>, T: Into<String>>(
    lines: impl IntoIterator<Item = S>,
    title: impl Into<Option<T>>,
) -> CreateReply {
    let title: Option<String> = title.into().map(Into::into);
    let remaining_chars = EMBED_MAX_LENGTH - title.as_ref().map_or_else(|| 1, String::len) + 2;
    let mut lines = lines
        .into_iter()
        .map(|s| {
            let mut s: String = s.into();
            s.push('\n');
            s
        })
        .collect::<Vec<String>>();
    if lines.is_empty() {
        let mut embed = info_embed("Nothing to show.");
        if let Some(title) = title {
            embed = embed.title(title);
        }
        return CreateReply::default().embed(embed);
    }
    let mut lines_dropped = {
        let lines_before_drop = lines.len();
        lines.retain(|s| s.len() <= DESCRIPTION_MAX_LENGTH + 1);
        lines_before_drop - lines.len()
    };
    let mut chars_dropped = 0usize;
    let mut total_chars = lines.iter().map(String::len).sum::<usize>();
    while total_chars > remaining_chars {
        let Some(longest) = lines
            .iter()
            .enumerate()
            .max_by_key(|(_, line)| line.len())
            .map(|(index, _)| index)
        else {
            break;
        };
        let chars = lines.remove(longest).len();
        total_chars -= chars;
        chars_dropped += chars;
        lines_dropped += 1;
    }
    let reply = if total_chars <= DESCRIPTION_MAX_LENGTH + 1 {
        let mut description = lines.concat();
        description.pop();
        let mut embed = info_embed(description);
        if let Some(title) = title {
            embed = embed.title(title);
        }
        CreateReply::default().embed(embed)
    } else {
        let mut half_lines = (lines.len() + 1) / 2;
        let mut first_description = String::new();
        lines.retain(|line| {
            if half_lines > 0 && first_description.len() + line.len() <= DESCRIPTION_MAX_LENGTH + 1
            {
                half_lines -= 1;
                first_description.push_str(line);
                false
            } else {
                true
            }
        });
        let mut second_description = lines.concat();
        first_description.pop();
        second_description.pop();
        if first_description.is_empty() {
            mem::swap(&mut first_description, &mut second_description);
        }
        let mut first_embed = info_embed(first_description);
        if let Some(title) = title {
            first_embed = first_embed.title(title);
        }
        CreateReply::default()
            .embed(first_embed)
            .embed(info_embed(second_description))
    };
    if lines_dropped > 0 {
        reply.content(format!(
            "This output has been truncated by {lines_dropped} lines ({chars_dropped} characters) because of Discord limits."
        ))
    } else {
        reply
    }
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut res = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        res.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            res.push(',');
        }
        res.push(digit);
    }
    res
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled.min(width)))
}

/// One block character per value, scaled to the largest.
pub fn sparkline(values: &[u64]) -> String {
    const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|value| {
            if max == 0 {
                BLOCKS[0]
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let index = (value * (BLOCKS.len() as u64 - 1) / max) as usize;
                BLOCKS[index]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(12345), "12,345");
        assert_eq!(format_thousands(1_000_000), "1,000,000");
        assert_eq!(format_thousands(-4500), "-4,500");
    }

    #[test]
    fn progress_bars_are_clamped() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(250.0, 4), "████");
    }

    #[test]
    fn sparklines_scale_to_the_peak() {
        assert_eq!(sparkline(&[0, 0, 0]), "▁▁▁");
        assert_eq!(sparkline(&[0, 7, 14]), "▁▄█");
    }
}
