//! Shared command routing: text sanitizing, control-token detection, the
//! admin/owner gate, and the public-channel redirect.

use {
    tracing::{info, warn},
    watchword_common::types::MessageEvent,
    watchword_slack::{Directory, SlackGateway},
};

/// Notice sent over IM when a configuration command shows up in public.
pub const PRIVACY_NOTICE: &str =
    "Hello!\nPlease configure me here, not in public (I'm a bit shy...)";

/// Where a message goes after the shared routing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No control token: the message continues to the extension's passive
    /// path (keyword search, or nothing).
    Fallthrough,
    /// Control token from a non-admin: dropped without any visible reaction.
    Ignored,
    /// Control token in a public channel: the privacy notice went out over
    /// IM and the command itself must not run.
    Redirected,
    /// Control token from an authorized sender over IM: run the command.
    Command,
}

/// Lowercase, fold the accented characters keywords are matched without,
/// and strip emphasis markers. A token that is pure markup vanishes from the
/// result; use [`token_pairs`] when indexes into the raw text matter.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'ï' | 'î' => 'i',
            'ö' | 'ô' => 'o',
            'ù' | 'ü' | 'û' => 'u',
            other => other,
        })
        .collect();
    // Longer markers first so `**` is not half-eaten by `*`.
    ["**", "*", "__", "_", "```", "`"]
        .iter()
        .fold(folded, |text, marker| text.replace(marker, ""))
}

/// Raw whitespace-separated tokens paired position-for-position with their
/// sanitized forms. Markup-only tokens sanitize to an empty string but keep
/// their slot, so arguments extracted by index line up with the raw text.
#[must_use]
pub fn token_pairs(text: &str) -> (Vec<String>, Vec<&str>) {
    let raw: Vec<&str> = text.split_whitespace().collect();
    let sanitized = raw.iter().map(|token| sanitize(token)).collect();
    (sanitized, raw)
}

/// Whether `token` appears as a standalone whitespace-separated word.
#[must_use]
pub fn has_control_token(sanitized: &str, token: &str) -> bool {
    sanitized.split_whitespace().any(|word| word == token)
}

/// The shared routing decision for a message carrying a control token.
///
/// Upstream lookup failures bubble up; the caller aborts the command without
/// replying. A denied sender is only logged, so the outcome is
/// indistinguishable from the bot not recognizing the message.
pub async fn route_command(
    event: &MessageEvent,
    directory: &Directory,
    gateway: &dyn SlackGateway,
) -> watchword_slack::Result<RouteOutcome> {
    if !directory.is_admin_or_owner(&event.user).await? {
        info!(user = %event.user, "command from non-admin ignored");
        return Ok(RouteOutcome::Ignored);
    }

    if event.channel_type.is_shared() {
        warn!(user = %event.user, channel = %event.channel, "redirecting public command to IM");
        let im = gateway.open_im(&event.user).await?;
        gateway.post_message(&im, None, PRIVACY_NOTICE).await?;
        return Ok(RouteOutcome::Redirected);
    }

    Ok(RouteOutcome::Command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_folds_accents() {
        assert_eq!(sanitize("Présentation à Paris"), "presentation a paris");
        assert_eq!(sanitize("Bientôt NOËL"), "bientot noel");
    }

    #[test]
    fn sanitize_strips_emphasis_markers() {
        assert_eq!(sanitize("*keyword* __add__ `stuff`"), "keyword add stuff");
        assert_eq!(sanitize("**bold** and ```code```"), "bold and code");
    }

    #[test]
    fn token_pairs_stay_aligned_through_markup_only_tokens() {
        let (tokens, raw) = token_pairs("Keyword add ** Héllo");
        assert_eq!(raw, vec!["Keyword", "add", "**", "Héllo"]);
        assert_eq!(tokens, vec!["keyword", "add", "", "hello"]);
    }

    #[test]
    fn control_token_must_be_standalone() {
        assert!(has_control_token("keyword list", "keyword"));
        assert!(has_control_token("so anyway keyword list", "keyword"));
        assert!(!has_control_token("keywords are fun", "keyword"));
        assert!(!has_control_token("mykeyword", "keyword"));
    }
}
