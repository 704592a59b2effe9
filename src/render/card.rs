#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use super::{week_labels, Dashboard, Leaderboard};
use crate::{config, database::ActivityCounts, message_utils::format_thousands};
use anyhow::{Context as _, Result};
use chrono::DateTime;
use resvg::{tiny_skia, usvg};
use std::sync::{Arc, OnceLock};
use tracing::debug;

const FONT_FAMILY: &str = "DejaVu Sans, Noto Sans, Liberation Sans, Arial, sans-serif";
const BACKGROUND: &str = "#2b2d31";
const PANEL: &str = "#1e1f22";
const HIGHLIGHT: &str = "#404249";
const ACCENT: &str = "#5865f2";
const WARNING: &str = "#faa61a";
const PODIUM: [&str; 3] = ["#ffd700", "#c0c0c0", "#cd7f32"];
const NAME_MAX_CHARS: usize = 28;

const TITLE: &str = r##"font-size="30" font-weight="bold" fill="#ffffff""##;
const HEADING: &str = r##"font-size="20" font-weight="bold" fill="#ffffff""##;
const BODY: &str = r##"font-size="18" fill="#dbdee1""##;
const MUTED: &str = r##"font-size="14" fill="#949ba4""##;
const LABEL: &str = r##"font-size="13" fill="#b5bac1""##;
const VALUE: &str = r##"font-size="24" font-weight="bold" fill="#ffffff""##;

/// Escapes text for use inside SVG markup and drops characters XML cannot hold.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

fn clip(name: &str) -> String {
    if name.chars().count() <= NAME_MAX_CHARS {
        name.to_owned()
    } else {
        let mut clipped = name.chars().take(NAME_MAX_CHARS - 1).collect::<String>();
        clipped.push('…');
        clipped
    }
}

struct Canvas {
    width: u32,
    height: u32,
    body: String,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
        };
        canvas.rect(0, 0, width, height, 18, BACKGROUND);
        canvas
    }

    fn rect(&mut self, x: u32, y: u32, width: u32, height: u32, radius: u32, fill: &str) {
        self.body.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{width}" height="{height}" rx="{radius}" fill="{fill}"/>"#
        ));
    }

    fn circle(&mut self, x: u32, y: u32, radius: u32, fill: &str) {
        self.body.push_str(&format!(
            r#"<circle cx="{x}" cy="{y}" r="{radius}" fill="{fill}"/>"#
        ));
    }

    fn text(&mut self, x: u32, y: u32, style: &str, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{x}" y="{y}" {style}>{}</text>"#,
            escape(content)
        ));
    }

    fn text_end(&mut self, x: u32, y: u32, style: &str, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{x}" y="{y}" text-anchor="end" {style}>{}</text>"#,
            escape(content)
        ));
    }

    fn text_middle(&mut self, x: u32, y: u32, style: &str, content: &str) {
        self.body.push_str(&format!(
            r#"<text x="{x}" y="{y}" text-anchor="middle" {style}>{}</text>"#,
            escape(content)
        ));
    }

    /// Track plus a fill proportional to `percent`.
    fn progress(&mut self, x: u32, y: u32, width: u32, percent: f64) {
        self.rect(x, y, width, 18, 9, HIGHLIGHT);
        let filled = (f64::from(width) * percent.clamp(0.0, 100.0) / 100.0).round() as u32;
        if filled > 0 {
            self.rect(x, y, filled.max(18), 18, 9, ACCENT);
        }
    }

    fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="{FONT_FAMILY}">{body}</svg>"#,
            width = self.width,
            height = self.height,
            body = self.body
        )
    }
}

fn counts_text(counts: &ActivityCounts) -> String {
    format!(
        "{} messages · {} reactions · {} images · {} shares · {} invites",
        counts.messages, counts.reactions, counts.images, counts.shares, counts.invites
    )
}

fn rank_badge(canvas: &mut Canvas, index: usize, x: u32, y: u32) {
    let fill = PODIUM.get(index).copied().unwrap_or(HIGHLIGHT);
    canvas.circle(x, y, 18, fill);
    let style = if index < PODIUM.len() {
        r##"font-size="16" font-weight="bold" fill="#1e1f22""##
    } else {
        r##"font-size="16" font-weight="bold" fill="#ffffff""##
    };
    canvas.text_middle(x, y + 6, style, &(index + 1).to_string());
}

const LEADERBOARD_WIDTH: u32 = 800;
const LEADERBOARD_ROW: u32 = 70;

pub fn leaderboard_svg(board: &Leaderboard) -> String {
    let rows = board.entries.len().max(1) as u32;
    let footer = board.footer();
    let height = 100 + rows * LEADERBOARD_ROW + if footer.is_some() { 50 } else { 10 };
    let mut canvas = Canvas::new(LEADERBOARD_WIDTH, height);
    canvas.text(40, 58, TITLE, "Leaderboard");
    canvas.text_end(LEADERBOARD_WIDTH - 40, 58, MUTED, "Top members by points");
    if board.entries.is_empty() {
        canvas.text(40, 130, BODY, "No one has earned points yet.");
    }
    for (index, (name, entry)) in board.entries.iter().enumerate() {
        let top = 90 + index as u32 * LEADERBOARD_ROW;
        let panel = if entry.user == board.viewer {
            HIGHLIGHT
        } else {
            PANEL
        };
        canvas.rect(24, top, LEADERBOARD_WIDTH - 48, LEADERBOARD_ROW - 8, 12, panel);
        rank_badge(&mut canvas, index, 60, top + 31);
        canvas.text(96, top + 28, HEADING, &clip(name));
        canvas.text(96, top + 50, MUTED, &counts_text(&entry.counts));
        canvas.text_end(
            LEADERBOARD_WIDTH - 44,
            top + 38,
            HEADING,
            &format!("{} pts", format_thousands(entry.points)),
        );
    }
    if let Some(footer) = footer {
        canvas.text(40, height - 24, BODY, &footer);
    }
    canvas.finish()
}

fn progress_caption(dashboard: &Dashboard) -> String {
    match dashboard.progress.remaining(dashboard.points) {
        Some(remaining) => format!(
            "{:.0}% · {} more points to {}",
            dashboard.progress.percent,
            format_thousands(remaining),
            format_thousands(dashboard.progress.next.unwrap_or_default())
        ),
        None => String::from("100% · Every milestone reached!"),
    }
}

fn today_text(dashboard: &Dashboard) -> String {
    let limit = if dashboard.daily_limit > 0 {
        format_thousands(dashboard.daily_limit)
    } else {
        String::from("∞")
    };
    format!(
        "{} / {limit} points today{}",
        format_thousands(dashboard.daily_points),
        if dashboard.capped { " (limit reached)" } else { "" }
    )
}

fn tile(canvas: &mut Canvas, x: u32, y: u32, label: &str, value: &str) {
    canvas.rect(x, y, 176, 76, 12, PANEL);
    canvas.text(x + 16, y + 28, LABEL, label);
    canvas.text(x + 16, y + 60, VALUE, value);
}

/// Seven bars for the week ending on the dashboard's day, tallest scaled to `height`.
fn weekly_chart(canvas: &mut Canvas, dashboard: &Dashboard, x: u32, bottom: u32, height: u32) {
    let max = dashboard.weekly.iter().copied().max().unwrap_or(0).max(1);
    let labels = week_labels(dashboard.today);
    for (index, (value, initial)) in dashboard.weekly.iter().zip(labels.chars()).enumerate() {
        let left = x + index as u32 * 44;
        let bar = ((*value as f64 / max as f64) * f64::from(height)).round() as u32;
        canvas.rect(left, bottom - height, 30, height, 6, PANEL);
        if bar > 0 {
            canvas.rect(left, bottom - bar, 30, bar, 6, ACCENT);
        }
        canvas.text_middle(left + 15, bottom + 20, LABEL, &initial.to_string());
    }
}

const DASHBOARD_WIDTH: u32 = 800;
const DASHBOARD_HEIGHT: u32 = 560;

pub fn dashboard_svg(dashboard: &Dashboard) -> String {
    let mut canvas = Canvas::new(DASHBOARD_WIDTH, DASHBOARD_HEIGHT);
    canvas.text(40, 58, TITLE, &format!("{}'s dashboard", clip(&dashboard.name)));
    let joined = dashboard
        .joined
        .and_then(|joined| DateTime::from_timestamp(joined.unix_timestamp(), 0))
        .map_or_else(
            || String::from("Joined: unknown"),
            |joined| format!("Joined {}", joined.format("%b %-d, %Y")),
        );
    canvas.text_end(DASHBOARD_WIDTH - 40, 58, MUTED, &joined);

    tile(&mut canvas, 24, 84, "POINTS", &format_thousands(dashboard.points));
    tile(&mut canvas, 212, 84, "LEVEL", &dashboard.level_number.to_string());
    tile(
        &mut canvas,
        400,
        84,
        "RANK",
        &format!("#{} of {}", dashboard.rank, dashboard.member_count),
    );
    tile(
        &mut canvas,
        588,
        84,
        "STREAK",
        &format!("{} days", dashboard.current_streak),
    );

    canvas.text(40, 196, BODY, &progress_caption(dashboard));
    canvas.progress(40, 208, DASHBOARD_WIDTH - 80, dashboard.progress.percent);
    let today_style = if dashboard.capped { WARNING } else { "#dbdee1" };
    canvas.text(
        40,
        256,
        &format!(r#"font-size="16" fill="{today_style}""#),
        &today_text(dashboard),
    );
    canvas.text_end(
        DASHBOARD_WIDTH - 40,
        256,
        MUTED,
        &format!(
            "Best streak {} · Role {}",
            dashboard.longest_streak,
            dashboard.role.as_deref().unwrap_or("none")
        ),
    );
    if let Some((value, reward)) = &dashboard.next_reward {
        let reward = reward.lines().next().unwrap_or_default();
        canvas.text(
            40,
            284,
            MUTED,
            &format!("Next reward at {}: {reward}", format_thousands(*value)),
        );
    }

    canvas.rect(24, 304, 360, 232, 12, PANEL);
    canvas.text(44, 334, HEADING, "Last 7 days");
    weekly_chart(&mut canvas, dashboard, 50, 496, 130);

    canvas.rect(400, 304, 376, 232, 12, PANEL);
    canvas.text(420, 334, HEADING, "Top members");
    if dashboard.top.is_empty() {
        canvas.text(420, 372, BODY, "Nobody yet");
    }
    for (index, (name, points)) in dashboard.top.iter().enumerate() {
        let y = 376 + index as u32 * 40;
        rank_badge(&mut canvas, index, 440, y - 6);
        canvas.text(470, y, BODY, &clip(name));
        canvas.text_end(756, y, BODY, &format_thousands(*points));
    }
    canvas.text(
        420,
        516,
        MUTED,
        &format!(
            "{} msgs · {} reacts · {} invites",
            dashboard.counts.messages, dashboard.counts.reactions, dashboard.counts.invites
        ),
    );
    canvas.finish()
}

const QUICK_WIDTH: u32 = 600;
const QUICK_HEIGHT: u32 = 230;

pub fn quick_stats_svg(dashboard: &Dashboard) -> String {
    let mut canvas = Canvas::new(QUICK_WIDTH, QUICK_HEIGHT);
    canvas.text(32, 50, HEADING, &clip(&dashboard.name));
    canvas.text_end(
        QUICK_WIDTH - 32,
        50,
        MUTED,
        &format!("Level {} · Rank #{}", dashboard.level_number, dashboard.rank),
    );
    canvas.text(
        32,
        104,
        r##"font-size="44" font-weight="bold" fill="#ffffff""##,
        &format!("{} pts", format_thousands(dashboard.points)),
    );
    canvas.text_end(
        QUICK_WIDTH - 32,
        100,
        BODY,
        &format!("{} day streak", dashboard.current_streak),
    );
    canvas.progress(32, 126, QUICK_WIDTH - 64, dashboard.progress.percent);
    canvas.text(32, 172, BODY, &progress_caption(dashboard));
    if dashboard.capped {
        canvas.text(
            32,
            204,
            r##"font-size="16" fill="#faa61a""##,
            "Daily limit reached, come back tomorrow!",
        );
    }
    canvas.finish()
}

fn fonts() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut fonts = usvg::fontdb::Database::new();
            fonts.load_system_fonts();
            if let Some(dir) = config::font_dir() {
                fonts.load_fonts_dir(dir);
            }
            debug!("Loaded {} font faces for cards", fonts.len());
            Arc::new(fonts)
        })
        .clone()
}

/// Draws an SVG document into PNG bytes.
pub fn rasterize(svg: &str) -> Result<Vec<u8>> {
    let options = usvg::Options {
        fontdb: fonts(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).context("card is not valid SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        tiny_skia::Pixmap::new(size.width(), size.height()).context("card has no area")?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap.encode_png().context("failed to encode card")
}

/// Rasterizes off the async workers.
pub async fn render_png(svg: String) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || rasterize(&svg)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::LeaderboardEntry, render::progress};
    use chrono::NaiveDate;
    use poise::serenity_prelude::UserId;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn entry(id: u64, points: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user: UserId::new(id),
            points,
            level: 0,
            counts: ActivityCounts {
                messages: 4,
                invites: 1,
                ..ActivityCounts::default()
            },
        }
    }

    fn dashboard(capped: bool) -> Dashboard {
        Dashboard {
            name: String::from("Ann & <Bob>"),
            points: 3000,
            level_number: 1,
            rank: 2,
            member_count: 9,
            current_streak: 4,
            longest_streak: 6,
            role: Some(String::from("Pit Novice")),
            joined: None,
            progress: progress(3000, Some(1000), Some(5000)),
            daily_points: 120,
            daily_limit: 120,
            capped,
            next_reward: Some((5000, String::from("5% discount\nsecond line"))),
            counts: ActivityCounts::default(),
            weekly: [0, 1, 2, 3, 0, 5, 8],
            today: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            top: vec![(String::from("alice"), 9000), (String::from("bob"), 3000)],
        }
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(escape(r#"a<b>&"c"'d'"#), "a&lt;b&gt;&amp;&quot;c&quot;&apos;d&apos;");
        assert_eq!(escape("tab\u{0}bed"), "tabbed");
    }

    #[test]
    fn long_names_are_clipped() {
        let clipped = clip(&"z".repeat(40));
        assert_eq!(clipped.chars().count(), NAME_MAX_CHARS);
        assert!(clipped.ends_with('…'));
        assert_eq!(clip("short"), "short");
    }

    #[test]
    fn leaderboard_card_lists_every_entry() {
        let board = Leaderboard {
            viewer: UserId::new(7),
            entries: vec![
                (String::from("<script>"), entry(1, 5000)),
                (String::from("bob"), entry(2, 1200)),
            ],
            viewer_rank: Some((12, 40)),
        };
        let svg = leaderboard_svg(&board);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("&lt;script&gt;"));
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("5,000 pts"));
        assert!(svg.contains("4 messages"));
        assert!(svg.contains("You are #12 with 40 points"));
    }

    #[test]
    fn viewer_row_is_highlighted() {
        let board = Leaderboard {
            viewer: UserId::new(2),
            entries: vec![
                (String::from("alice"), entry(1, 5000)),
                (String::from("bob"), entry(2, 1200)),
            ],
            viewer_rank: None,
        };
        let svg = leaderboard_svg(&board);
        assert_eq!(svg.matches(&format!(r#"fill="{HIGHLIGHT}""#)).count(), 1);
        assert!(!svg.contains("You are #"));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let board = Leaderboard {
            viewer: UserId::new(1),
            entries: Vec::new(),
            viewer_rank: None,
        };
        assert!(leaderboard_svg(&board).contains("No one has earned points yet."));
    }

    #[test]
    fn dashboard_card_shows_progress_and_limit() {
        let svg = dashboard_svg(&dashboard(true));
        assert!(svg.contains("Ann &amp; &lt;Bob&gt;&apos;s dashboard"));
        assert!(svg.contains("50% · 2,000 more points to 5,000"));
        assert!(svg.contains("120 / 120 points today (limit reached)"));
        assert!(svg.contains("Next reward at 5,000: 5% discount<"));
        assert!(svg.contains("Joined: unknown"));
    }

    #[test]
    fn quick_card_mentions_the_cap_only_when_capped() {
        assert!(quick_stats_svg(&dashboard(true)).contains("Daily limit reached"));
        assert!(!quick_stats_svg(&dashboard(false)).contains("Daily limit reached"));
    }

    #[test]
    fn cards_rasterize_to_png() {
        let png = rasterize(&dashboard_svg(&dashboard(false))).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        let board = Leaderboard {
            viewer: UserId::new(1),
            entries: vec![(String::from("alice"), entry(1, 10))],
            viewer_rank: None,
        };
        let png = rasterize(&leaderboard_svg(&board)).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
    }

    #[test]
    fn broken_svg_is_an_error() {
        assert!(rasterize("<svg").is_err());
    }

    #[tokio::test]
    async fn rendering_runs_off_the_runtime() {
        let png = render_png(quick_stats_svg(&dashboard(false))).await.unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));
    }
}
