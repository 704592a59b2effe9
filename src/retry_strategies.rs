use backon::FibonacciBuilder;
use poise::serenity_prelude::{Error as SerenityError, HttpError};
use std::{sync::OnceLock, time::Duration};

static DISCORD_RETRY_STRATEGY: OnceLock<FibonacciBuilder> = OnceLock::new();

pub fn discord_retry_strategy() -> &'static FibonacciBuilder {
    DISCORD_RETRY_STRATEGY.get_or_init(|| {
        FibonacciBuilder::default()
            .with_jitter()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(1500))
            .with_max_times(5)
    })
}

/// Discord error codes that will fail the same way on every attempt.
const fn is_permanent_code(code: isize) -> bool {
    matches!(
        code,
        10003 // unknown channel
            | 10007 // unknown member
            | 10011 // unknown role
            | 10013 // unknown user
            | 50001 // missing access
            | 50007 // cannot message user
            | 50013 // missing permissions
    )
}

pub const fn should_retry(err: &SerenityError) -> bool {
    if let SerenityError::Http(HttpError::UnsuccessfulRequest(err)) = err {
        if is_permanent_code(err.error.code) {
            return false;
        }
    }
    true
}

/// Unknown channel, used to decide when a stored channel must be recreated.
pub const fn is_unknown_channel(err: &SerenityError) -> bool {
    if let SerenityError::Http(HttpError::UnsuccessfulRequest(err)) = err {
        return err.error.code == 10003;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_codes_are_not_retried() {
        assert!(is_permanent_code(50007));
        assert!(is_permanent_code(10003));
        assert!(!is_permanent_code(0));
        assert!(!is_permanent_code(130000));
    }

    #[test]
    fn non_http_errors_are_retried() {
        assert!(should_retry(&SerenityError::Other("gateway hiccup")));
        assert!(!is_unknown_channel(&SerenityError::Other("gateway hiccup")));
    }
}
