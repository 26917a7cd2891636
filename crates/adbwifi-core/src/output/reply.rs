//! Classification of `adb connect` / `adb disconnect` replies.
//!
//! Both commands exit with status 0 even when they fail, so success has to be
//! read from the text:
//!
//! | Reply                                             | Meaning   |
//! |---------------------------------------------------|-----------|
//! | `connected to 192.168.1.20:5555`                  | accepted  |
//! | `already connected to 192.168.1.20:5555`          | accepted  |
//! | `disconnected 192.168.1.20:5555`                  | accepted  |
//! | `failed to connect to '192.168.1.20:5555': ...`   | rejected  |
//! | `cannot connect to 192.168.1.20:5555: ...`        | rejected  |
//! | `unable to connect to 192.168.1.20:5555`          | rejected  |
//! | `error: no such device '192.168.1.20:5555'`       | rejected  |

/// Outcome of a connect or disconnect command, carrying the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Accepted(String),
    Rejected(String),
}

const REJECTION_PREFIXES: [&str; 3] = ["failed", "cannot", "unable"];

/// Classifies a reply by its wording.
pub fn classify_reply(output: &str) -> BridgeReply {
    let text = output.trim().to_string();
    let lower = text.to_ascii_lowercase();

    let rejected = REJECTION_PREFIXES.iter().any(|p| lower.starts_with(p))
        || lower.contains("error");
    if rejected {
        BridgeReply::Rejected(text)
    } else {
        BridgeReply::Accepted(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reply_connected_is_accepted() {
        assert_eq!(
            classify_reply("connected to 192.168.1.20:5555\n"),
            BridgeReply::Accepted("connected to 192.168.1.20:5555".to_string())
        );
    }

    #[test]
    fn test_classify_reply_already_connected_is_accepted() {
        assert!(matches!(
            classify_reply("already connected to 192.168.1.20:5555"),
            BridgeReply::Accepted(_)
        ));
    }

    #[test]
    fn test_classify_reply_disconnected_is_accepted() {
        assert!(matches!(
            classify_reply("disconnected 192.168.1.20:5555"),
            BridgeReply::Accepted(_)
        ));
    }

    #[test]
    fn test_classify_reply_failure_wordings_are_rejected() {
        for reply in [
            "failed to connect to '192.168.1.20:5555': Connection refused",
            "cannot connect to 192.168.1.20:5555: No route to host (113)",
            "unable to connect to 192.168.1.20:5555",
            "error: no such device '192.168.1.20:5555'",
        ] {
            assert!(
                matches!(classify_reply(reply), BridgeReply::Rejected(_)),
                "expected rejection for {reply:?}"
            );
        }
    }

    #[test]
    fn test_classify_reply_rejection_keeps_text_verbatim() {
        assert_eq!(
            classify_reply("  failed to authenticate to 10.0.0.2:5555\r\n"),
            BridgeReply::Rejected("failed to authenticate to 10.0.0.2:5555".to_string())
        );
    }
}
