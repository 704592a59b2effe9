use crate::constants::NAME_TIMEOUT;
use ahash::RandomState;
use moka::future::Cache;
use poise::serenity_prelude::{Context, User, UserId};
use std::{sync::OnceLock, time::Duration};
use tokio::{task, time};

static NAMES: OnceLock<Cache<UserId, String, RandomState>> = OnceLock::new();

fn names() -> &'static Cache<UserId, String, RandomState> {
    NAMES.get_or_init(|| {
        Cache::builder()
            .max_capacity(10000)
            .time_to_live(Duration::from_secs(60 * 60))
            .build_with_hasher(RandomState::new())
    })
}

fn user_name(user: &User) -> String {
    user.global_name.clone().unwrap_or_else(|| user.name.clone())
}

pub fn fallback_name(user: UserId) -> String {
    format!("User {user}")
}

/// Best-effort display name; slow lookups finish in the background and return a placeholder.
pub async fn display_name(ctx: &Context, user: UserId) -> String {
    if let Some(name) = ctx.cache.user(user).map(|user| user_name(&user)) {
        return name;
    }
    let http = ctx.http.clone();
    let mut request = Box::pin(names().optionally_get_with(user, async move {
        http.get_user(user).await.ok().map(|user| user_name(&user))
    }));
    match time::timeout(NAME_TIMEOUT, &mut request).await {
        Ok(name) => name.unwrap_or_else(|| fallback_name(user)),
        Err(_) => {
            task::spawn(request);
            fallback_name(user)
        }
    }
}
