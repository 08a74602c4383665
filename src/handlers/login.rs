//! Component E: the login state machine (spec.md §4.3).

use crate::config::Config;
use std::time::{Duration, Instant};

/// The ten named login flags of spec.md §4.3. NICKLST and BOTINFO/MYHUBURL
/// don't gate "login done" but are tracked so the server knows what
/// optional greeting pieces the client already received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginFlags {
    pub keyok: bool,
    pub valnick: bool,
    pub passwd: bool,
    pub version: bool,
    pub myinfo: bool,
    pub allowed: bool,
    pub nicklst: bool,
    pub supports: bool,
    pub botinfo: bool,
    pub myhuburl: bool,
}

impl LoginFlags {
    /// "Login done" requires every flag except NICKLST (spec.md §4.3).
    pub fn login_done(&self) -> bool {
        self.keyok && self.valnick && self.passwd && self.version && self.myinfo && self.allowed && self.supports
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    New,
    AwaitingKey,
    AwaitingNick,
    AwaitingPassword,
    AwaitingRest,
    Done,
}

pub struct LoginSession {
    pub state: LoginState,
    pub flags: LoginFlags,
    pub challenge: String,
    pub nick: Option<String>,
    pub password_failures: u32,
    pub features: u32,
}

impl LoginSession {
    pub fn new(challenge: String) -> Self {
        Self {
            state: LoginState::New,
            flags: LoginFlags::default(),
            challenge,
            nick: None,
            password_failures: 0,
            features: 0,
        }
    }

    pub fn on_key_ok(&mut self) {
        self.flags.keyok = true;
        self.state = LoginState::AwaitingNick;
    }

    pub fn on_supports(&mut self, feature_bits: u32) {
        self.flags.supports = true;
        self.features = feature_bits;
    }

    pub fn on_version(&mut self) {
        self.flags.version = true;
    }

    pub fn on_get_nick_list(&mut self) {
        self.flags.nicklst = true;
    }

    /// Returns true the first time MyINFO is processed, so the caller can
    /// invoke the "first MyINFO" hook named in spec.md §4.3.
    pub fn on_myinfo(&mut self) -> bool {
        let first = !self.flags.myinfo;
        self.flags.myinfo = true;
        first
    }

    pub fn on_password_match(&mut self) {
        self.flags.passwd = true;
    }

    /// Returns the IP temp-ban duration to apply on mismatch, scaled by
    /// `pwd_tmpban_multiplier` and the running failure count (spec.md
    /// §4.3: "possibly add temporary IP ban (pwd_tmpban × multiplier)").
    pub fn on_password_mismatch(&mut self, config: &Config) -> Duration {
        self.password_failures += 1;
        let factor = config.security.pwd_tmpban_multiplier.max(1) * self.password_failures;
        Duration::from_secs(config.security.pwd_tmpban_secs.saturating_mul(factor as u64))
    }

    pub fn mark_allowed(&mut self) {
        self.flags.allowed = true;
        if self.flags.login_done() {
            self.state = LoginState::Done;
        }
    }
}

/// Validates a candidate nick against configured syntax rules (spec.md
/// §4.3: "min/max length, forbidden chars, prefix rules, not reserved,
/// not a bot").
pub fn validate_nick(nick: &str, config: &Config, is_bot_nick: impl Fn(&str) -> bool) -> Result<(), &'static str> {
    if nick.len() < config.nick.min_len {
        return Err("nick too short");
    }
    if nick.len() > config.nick.max_len {
        return Err("nick too long");
    }
    if nick.chars().any(|c| config.nick.forbidden_chars.contains(c)) {
        return Err("nick contains forbidden characters");
    }
    if config.nick.reserved.iter().any(|r| r.eq_ignore_ascii_case(nick)) {
        return Err("nick is reserved");
    }
    if is_bot_nick(nick) {
        return Err("nick collides with a bot");
    }
    Ok(())
}

pub fn deadline(now: Instant, secs: u64) -> Instant {
    now + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_done_ignores_nicklst() {
        let mut s = LoginSession::new("lock".into());
        s.on_key_ok();
        s.flags.valnick = true;
        s.on_password_match();
        s.on_version();
        s.on_myinfo();
        s.flags.supports = true;
        assert!(!s.flags.login_done()); // ALLOWED not yet set
        s.mark_allowed();
        assert!(s.flags.login_done());
        assert_eq!(s.state, LoginState::Done);
    }

    #[test]
    fn first_myinfo_is_flagged_once() {
        let mut s = LoginSession::new("lock".into());
        assert!(s.on_myinfo());
        assert!(!s.on_myinfo());
    }

    #[test]
    fn nick_validation_rejects_forbidden_chars() {
        let config = Config::default();
        assert!(validate_nick("good_nick", &config, |_| false).is_ok());
        assert!(validate_nick("bad|nick", &config, |_| false).is_err());
    }

    #[test]
    fn password_mismatch_scales_ban_with_failures() {
        let config = Config::default();
        let mut s = LoginSession::new("lock".into());
        let first = s.on_password_mismatch(&config);
        let second = s.on_password_mismatch(&config);
        assert!(second > first);
    }
}
