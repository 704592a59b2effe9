use crate::{
    config::ConfigKey,
    constants::{GOLD_COLOR, INFO_COLOR, LEADERBOARD_SIZE},
    database::{db, ActivityCounts, LeaderboardEntry},
    message_utils::{format_thousands, progress_bar, sparkline},
    names::display_name,
};
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use poise::{
    serenity_prelude::{
        Context, CreateAttachment, CreateEmbed, CreateEmbedFooter, GuildId, Mention, Timestamp,
        UserId,
    },
    CreateReply,
};
use tracing::warn;

pub mod card;

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
const PROGRESS_WIDTH: usize = 12;

/// Position of a member between two milestones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub floor: i64,
    pub next: Option<i64>,
}

impl Progress {
    pub const fn remaining(&self, points: i64) -> Option<i64> {
        match self.next {
            Some(next) => Some(next - points),
            None => None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn progress(points: i64, previous: Option<i64>, next: Option<i64>) -> Progress {
    let floor = previous.unwrap_or(0);
    let percent = match next {
        Some(next) if next > floor => {
            ((points - floor) as f64 / (next - floor) as f64 * 100.0).clamp(0.0, 100.0)
        }
        _ => 100.0,
    };
    Progress {
        percent,
        floor,
        next,
    }
}

fn rank_label(index: usize) -> String {
    MEDALS
        .get(index)
        .map_or_else(|| format!("`#{}`", index + 1), |medal| (*medal).to_owned())
}

fn counts_line(counts: &ActivityCounts) -> String {
    format!(
        "💬 {} · ❤️ {} · 🖼️ {} · 🔗 {} · 📨 {}",
        counts.messages, counts.reactions, counts.images, counts.shares, counts.invites
    )
}

/// One line per entry; the viewer's own line is marked and bolded.
pub fn leaderboard_lines(
    entries: &[(String, LeaderboardEntry)],
    viewer: UserId,
) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(index, (name, entry))| {
            let head = format!(
                "{} {} · {} pts",
                rank_label(index),
                name,
                format_thousands(entry.points)
            );
            if entry.user == viewer {
                format!("➤ **{head}**\n{}", counts_line(&entry.counts))
            } else {
                format!("{head}\n{}", counts_line(&entry.counts))
            }
        })
        .collect()
}

/// The top members with display names, plus the viewer's own standing when they
/// are not among them.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    pub viewer: UserId,
    pub entries: Vec<(String, LeaderboardEntry)>,
    pub viewer_rank: Option<(u64, i64)>,
}

impl Leaderboard {
    pub fn footer(&self) -> Option<String> {
        self.viewer_rank.map(|(rank, points)| {
            format!("You are #{rank} with {} points", format_thousands(points))
        })
    }
}

pub async fn load_leaderboard(ctx: &Context, viewer: UserId) -> Result<Leaderboard> {
    let db = db().await;
    let top = db.top_users(LEADERBOARD_SIZE).await?;
    let mut entries = Vec::with_capacity(top.len());
    for entry in top {
        entries.push((display_name(ctx, entry.user).await, entry));
    }
    let viewer_rank = if entries.iter().any(|(_, entry)| entry.user == viewer) {
        None
    } else {
        match (db.member_rank(viewer).await?, db.member(viewer).await?) {
            (Some(rank), Some(member)) => Some((rank, member.total_points)),
            _ => None,
        }
    };
    Ok(Leaderboard {
        viewer,
        entries,
        viewer_rank,
    })
}

fn leaderboard_caption(board: &Leaderboard) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("🏆 Leaderboard")
        .color(GOLD_COLOR)
        .timestamp(Timestamp::now());
    match board.footer() {
        Some(footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

/// Text-only leaderboard, sent when the card cannot be drawn.
pub fn leaderboard_embed(board: &Leaderboard) -> CreateEmbed {
    let description = if board.entries.is_empty() {
        String::from("No one has earned points yet.")
    } else {
        leaderboard_lines(&board.entries, board.viewer).join("\n\n")
    };
    leaderboard_caption(board).description(description)
}

/// Attaches the rendered card under `caption`, or sends `fallback` when drawing fails.
async fn card_reply(
    svg: String,
    file_name: &str,
    caption: CreateEmbed,
    fallback: CreateEmbed,
) -> CreateReply {
    match card::render_png(svg).await {
        Ok(png) => CreateReply::default()
            .embed(caption.image(format!("attachment://{file_name}")))
            .attachment(CreateAttachment::bytes(png, file_name)),
        Err(err) => {
            warn!("Failed to render {file_name}: {err:#}");
            CreateReply::default().embed(fallback)
        }
    }
}

pub async fn leaderboard_reply(board: &Leaderboard) -> CreateReply {
    card_reply(
        card::leaderboard_svg(board),
        "leaderboard.png",
        leaderboard_caption(board),
        leaderboard_embed(board),
    )
    .await
}

pub async fn dashboard_reply(dashboard: &Dashboard) -> CreateReply {
    let caption = CreateEmbed::new()
        .title(format!("📊 {}'s dashboard", dashboard.name))
        .color(INFO_COLOR)
        .timestamp(Timestamp::now());
    card_reply(
        card::dashboard_svg(dashboard),
        "dashboard.png",
        caption,
        dashboard_embed(dashboard),
    )
    .await
}

pub async fn quick_stats_reply(dashboard: &Dashboard) -> CreateReply {
    let caption = CreateEmbed::new()
        .title(format!("⚡ {}", dashboard.name))
        .color(INFO_COLOR);
    card_reply(
        card::quick_stats_svg(dashboard),
        "mystats.png",
        caption,
        quick_stats_embed(dashboard),
    )
    .await
}

/// Everything shown on a member's dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub name: String,
    pub points: i64,
    pub level_number: u64,
    pub rank: u64,
    pub member_count: u64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub role: Option<String>,
    pub joined: Option<Timestamp>,
    pub progress: Progress,
    pub daily_points: i64,
    pub daily_limit: i64,
    pub capped: bool,
    pub next_reward: Option<(i64, String)>,
    pub counts: ActivityCounts,
    pub weekly: [u64; 7],
    pub today: NaiveDate,
    pub top: Vec<(String, i64)>,
}

/// `None` when the member has never earned points.
pub async fn load_dashboard(
    ctx: &Context,
    guild: Option<GuildId>,
    user: UserId,
) -> Result<Option<Dashboard>> {
    let db = db().await;
    let Some(member) = db.member(user).await? else {
        return Ok(None);
    };
    let now = Utc::now();
    let today = now.date_naive();
    let points = member.total_points;
    let previous = db.previous_milestone_at_or_below(points).await?;
    let next = db.next_milestone_above(points).await?;
    let daily_limit = db.config_i64(ConfigKey::DailyPointsLimit).await?;
    let joined = match guild {
        Some(guild) => guild
            .member(ctx, user)
            .await
            .ok()
            .and_then(|member| member.joined_at),
        None => None,
    };
    let mut top = Vec::new();
    for (top_user, top_points) in db.leaderboard(3).await? {
        top.push((display_name(ctx, top_user).await, top_points));
    }
    Ok(Some(Dashboard {
        name: display_name(ctx, user).await,
        points,
        level_number: db.level_number(points).await?,
        rank: db.member_rank(user).await?.unwrap_or(0),
        member_count: db.member_count().await?,
        current_streak: member.current_streak,
        longest_streak: member.longest_streak,
        role: db.milestone_role_for(member.level).await?,
        joined,
        progress: progress(
            points,
            previous.map(|milestone| milestone.value),
            next.map(|milestone| milestone.value),
        ),
        daily_points: db.daily_points(user, now).await?,
        daily_limit,
        capped: daily_limit > 0 && !db.can_earn(user, 1, daily_limit, now).await?,
        next_reward: db
            .next_reward_above(points)
            .await?
            .and_then(|milestone| milestone.reward.map(|reward| (milestone.value, reward))),
        counts: db.activity_counts(user).await?,
        weekly: db.weekly_activity(user, today).await?,
        today,
        top,
    }))
}

fn progress_line(dashboard: &Dashboard) -> String {
    let bar = progress_bar(dashboard.progress.percent, PROGRESS_WIDTH);
    match dashboard.progress.remaining(dashboard.points) {
        Some(remaining) => format!(
            "{bar} {:.0}%\n{} more points to {}",
            dashboard.progress.percent,
            format_thousands(remaining),
            format_thousands(dashboard.progress.next.unwrap_or_default())
        ),
        None => format!("{bar} 100%\nEvery milestone reached!"),
    }
}

/// Weekday initials for the seven days ending on `today`.
pub fn week_labels(today: NaiveDate) -> String {
    (0..7)
        .rev()
        .map(|days_ago| {
            (today - ChronoDuration::days(days_ago))
                .weekday()
                .to_string()
                .chars()
                .next()
                .unwrap_or(' ')
        })
        .collect()
}

pub fn dashboard_embed(dashboard: &Dashboard) -> CreateEmbed {
    let top = if dashboard.top.is_empty() {
        String::from("Nobody yet")
    } else {
        dashboard
            .top
            .iter()
            .enumerate()
            .map(|(index, (name, points))| {
                format!("{} {} · {}", rank_label(index), name, format_thousands(*points))
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let limit = if dashboard.daily_limit > 0 {
        format_thousands(dashboard.daily_limit)
    } else {
        String::from("∞")
    };
    let mut embed = CreateEmbed::new()
        .title(format!("📊 {}'s dashboard", dashboard.name))
        .color(INFO_COLOR)
        .field("Points", format_thousands(dashboard.points), true)
        .field("Level", dashboard.level_number.to_string(), true)
        .field(
            "Rank",
            format!("#{} of {}", dashboard.rank, dashboard.member_count),
            true,
        )
        .field(
            "Streak",
            format!(
                "🔥 {} days (best {})",
                dashboard.current_streak, dashboard.longest_streak
            ),
            true,
        )
        .field(
            "Role",
            dashboard.role.clone().unwrap_or_else(|| String::from("None")),
            true,
        )
        .field(
            "Joined",
            dashboard
                .joined
                .map_or_else(|| String::from("Unknown"), |joined| format!("<t:{}:D>", joined.unix_timestamp())),
            true,
        )
        .field("Progress", progress_line(dashboard), false)
        .field(
            "Today",
            format!(
                "{} / {limit} points{}",
                format_thousands(dashboard.daily_points),
                if dashboard.capped { " (limit reached)" } else { "" }
            ),
            true,
        );
    if let Some((value, reward)) = &dashboard.next_reward {
        embed = embed.field(
            "Next reward",
            format!("{reward} at {} points", format_thousands(*value)),
            true,
        );
    }
    embed
        .field("Activity", counts_line(&dashboard.counts), false)
        .field(
            "Last 7 days",
            format!(
                "`{}`\n`{}`",
                sparkline(&dashboard.weekly),
                week_labels(dashboard.today)
            ),
            true,
        )
        .field("Top members", top, true)
        .timestamp(Timestamp::now())
}

pub fn quick_stats_embed(dashboard: &Dashboard) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("⚡ {}", dashboard.name))
        .color(INFO_COLOR)
        .description(format!(
            "**{}** points · level {} · rank #{}\n🔥 {} day streak\n{}{}",
            format_thousands(dashboard.points),
            dashboard.level_number,
            dashboard.rank,
            dashboard.current_streak,
            progress_line(dashboard),
            if dashboard.capped {
                "\n⏸️ Daily limit reached, come back tomorrow!"
            } else {
                ""
            }
        ))
}

/// Reply for members without any points yet.
pub fn no_points_embed(user: UserId) -> CreateEmbed {
    CreateEmbed::new()
        .color(INFO_COLOR)
        .description(format!(
            "{} hasn't earned any points yet. Chat, react and invite friends to get started!",
            Mention::User(user)
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_measured_from_the_previous_milestone() {
        let halfway = progress(3000, Some(1000), Some(5000));
        assert!((halfway.percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(halfway.remaining(3000), Some(2000));
        let start = progress(250, None, Some(1000));
        assert!((start.percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(start.floor, 0);
    }

    #[test]
    fn progress_is_complete_without_a_next_milestone() {
        let done = progress(80000, Some(50000), None);
        assert!((done.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(done.remaining(80000), None);
    }

    #[test]
    fn viewer_is_highlighted() {
        let entry = |id, points| LeaderboardEntry {
            user: UserId::new(id),
            points,
            level: 0,
            counts: ActivityCounts {
                messages: 2,
                ..ActivityCounts::default()
            },
        };
        let lines = leaderboard_lines(
            &[
                (String::from("alice"), entry(1, 5000)),
                (String::from("bob"), entry(2, 1200)),
            ],
            UserId::new(2),
        );
        assert_eq!(
            lines[0],
            "🥇 alice · 5,000 pts\n💬 2 · ❤️ 0 · 🖼️ 0 · 🔗 0 · 📨 0"
        );
        assert!(lines[1].starts_with("➤ **🥈 bob · 1,200 pts**"));
    }

    #[test]
    fn footer_only_for_viewers_off_the_board() {
        let mut board = Leaderboard {
            viewer: UserId::new(9),
            entries: Vec::new(),
            viewer_rank: Some((14, 2500)),
        };
        assert_eq!(board.footer().as_deref(), Some("You are #14 with 2,500 points"));
        board.viewer_rank = None;
        assert_eq!(board.footer(), None);
    }

    #[test]
    fn ranks_past_the_podium_are_numbered() {
        assert_eq!(rank_label(0), "🥇");
        assert_eq!(rank_label(3), "`#4`");
    }

    #[test]
    fn week_labels_end_today() {
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(week_labels(sunday), "MTWTFSS");
    }
}
