//! Flag submission state machine
//!
//! `Idle -> Validating -> Verifying -> Accepted | Rejected -> Idle`
//!
//! Validation is purely syntactic (`flag{...}` with a non-empty interior)
//! and happens locally with no network round-trip. Correctness is decided
//! solely by the server: this module produces a `VerifyRequest` and later
//! consumes the server's verdict (or the transport failure). While a
//! verification is in flight, further submissions are refused - the
//! level-advance side effect is not idempotent under double fire.
//!
//! Advancing is monotonic: resubmitting an already-solved level's flag can
//! never move the player backwards.

use serde::{Deserialize, Serialize};

/// Request sent to the external verification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyRequest {
    pub level: u32,
    pub flag: String,
}

/// The server's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub next_level: Option<u32>,
}

/// What a `submit` attempt turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    /// Local syntax check failed; nothing was sent anywhere
    BadFormat,
    /// A previous submission is still being verified; this one is refused
    AlreadyPending,
    /// Syntax is fine - ask the server
    Verify(VerifyRequest),
}

/// Terminal outcome of a verification round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { message: String, next_level: u32 },
    /// Server graded the flag and it is wrong
    WrongAnswer { message: String },
    /// The server could not be reached; the flag was never graded
    VerificationFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Verifying,
}

/// Submission protocol for one terminal instance.
pub struct FlagProtocol {
    state: State,
    level: u32,
}

/// Local syntax check: `flag{...}` with at least one character inside.
pub fn flag_format_ok(text: &str) -> bool {
    text.strip_prefix("flag{")
        .and_then(|rest| rest.strip_suffix('}'))
        .is_some_and(|interior| !interior.is_empty())
}

impl FlagProtocol {
    pub fn new(level: u32) -> Self {
        Self { state: State::Idle, level }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_pending(&self) -> bool {
        self.state == State::Verifying
    }

    /// Begin a submission. At most one verification is in flight per
    /// session; callers surface `AlreadyPending` without re-entering.
    pub fn submit(&mut self, flag: &str) -> SubmitAction {
        if self.state == State::Verifying {
            return SubmitAction::AlreadyPending;
        }
        if !flag_format_ok(flag) {
            return SubmitAction::BadFormat;
        }
        self.state = State::Verifying;
        SubmitAction::Verify(VerifyRequest { level: self.level, flag: flag.to_string() })
    }

    /// Consume the verification result. Returns `None` if no submission
    /// was pending (a stale or duplicate resolution is ignored).
    pub fn resolve(&mut self, result: Result<VerifyResponse, String>) -> Option<Verdict> {
        if self.state != State::Verifying {
            return None;
        }
        self.state = State::Idle;

        Some(match result {
            Ok(resp) if resp.success => {
                // Monotonic: never below solved + 1, even if the server
                // reports a stale next level
                let next = resp.next_level.unwrap_or(self.level + 1).max(self.level + 1);
                let message = if resp.message.is_empty() {
                    "Correct! Moving to next level.".to_string()
                } else {
                    resp.message
                };
                Verdict::Accepted { message, next_level: next }
            }
            Ok(resp) => {
                let message = if resp.message.is_empty() {
                    "Incorrect flag. Keep digging.".to_string()
                } else {
                    resp.message
                };
                Verdict::WrongAnswer { message }
            }
            Err(err) => Verdict::VerificationFailed {
                message: format!("Could not verify flag ({}). Your answer was not graded - try again.", err),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(next: Option<u32>) -> Result<VerifyResponse, String> {
        Ok(VerifyResponse { success: true, message: String::new(), next_level: next })
    }

    #[test]
    fn test_format_check() {
        assert!(flag_format_ok("flag{x}"));
        assert!(flag_format_ok("flag{grep_master_123}"));
        assert!(!flag_format_ok("not-a-flag"));
        assert!(!flag_format_ok("flag{}"));
        assert!(!flag_format_ok("flag{"));
        assert!(!flag_format_ok("FLAG{x}"));
        assert!(!flag_format_ok(""));
    }

    #[test]
    fn test_bad_format_short_circuits() {
        let mut p = FlagProtocol::new(3);
        assert_eq!(p.submit("not-a-flag"), SubmitAction::BadFormat);
        assert!(!p.is_pending());
    }

    #[test]
    fn test_well_formed_flag_produces_one_request() {
        let mut p = FlagProtocol::new(3);
        let action = p.submit("flag{x}");
        assert_eq!(
            action,
            SubmitAction::Verify(VerifyRequest { level: 3, flag: "flag{x}".into() })
        );
        assert!(p.is_pending());
    }

    #[test]
    fn test_second_submit_while_pending_is_refused() {
        let mut p = FlagProtocol::new(3);
        p.submit("flag{x}");
        assert_eq!(p.submit("flag{y}"), SubmitAction::AlreadyPending);
    }

    #[test]
    fn test_accept_uses_server_next_level() {
        let mut p = FlagProtocol::new(3);
        p.submit("flag{x}");
        let verdict = p.resolve(accepted(Some(4)));
        assert_eq!(
            verdict,
            Some(Verdict::Accepted {
                message: "Correct! Moving to next level.".into(),
                next_level: 4
            })
        );
        assert!(!p.is_pending());
    }

    #[test]
    fn test_accept_is_monotonic() {
        // Server reporting a stale next level cannot regress progress
        let mut p = FlagProtocol::new(5);
        p.submit("flag{x}");
        match p.resolve(accepted(Some(2))) {
            Some(Verdict::Accepted { next_level, .. }) => assert_eq!(next_level, 6),
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_answer() {
        let mut p = FlagProtocol::new(3);
        p.submit("flag{wrong}");
        let verdict = p.resolve(Ok(VerifyResponse {
            success: false,
            message: "Nope.".into(),
            next_level: None,
        }));
        assert_eq!(verdict, Some(Verdict::WrongAnswer { message: "Nope.".into() }));
        assert!(!p.is_pending());
    }

    #[test]
    fn test_transport_failure_is_distinct() {
        let mut p = FlagProtocol::new(3);
        p.submit("flag{x}");
        match p.resolve(Err("connection refused".into())) {
            Some(Verdict::VerificationFailed { message }) => {
                assert!(message.contains("not graded"));
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_stale_resolution_ignored() {
        let mut p = FlagProtocol::new(3);
        assert_eq!(p.resolve(accepted(Some(4))), None);
    }

    #[test]
    fn test_resubmit_after_accept_allowed_again() {
        let mut p = FlagProtocol::new(3);
        p.submit("flag{x}");
        p.resolve(accepted(Some(4)));
        // Back to Idle; a new submission starts a fresh round-trip
        assert!(matches!(p.submit("flag{x}"), SubmitAction::Verify(_)));
    }

    #[test]
    fn test_wire_formats() {
        let req = VerifyRequest { level: 3, flag: "flag{x}".into() };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"level":3,"flag":"flag{x}"}"#);

        let resp: VerifyResponse =
            serde_json::from_str(r#"{"success":true,"message":"ok","next_level":4}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.next_level, Some(4));

        // Missing optional fields default
        let resp: VerifyResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(resp.message, "");
        assert_eq!(resp.next_level, None);
    }
}
