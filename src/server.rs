//! The server context (spec.md §5, §9: "the user collection, ban list, and
//! broadcast caches are owned by the server object and mutated only from
//! the main loop"). `Server` is the single owner of every shared resource;
//! nothing here is behind a lock because nothing here runs off the main
//! loop's thread.

use crate::config::limits::FloodAction;
use crate::config::Config;
use crate::db::Database;
use crate::error::{CloseReason, HubError, HubResult};
use crate::geo::GeoLookup;
use crate::handlers::{admission, chat, ctm, login, opcmd, search};
use crate::net::connection::LoginFlagsSnapshot;
use crate::net::{Connection, Gateway, ReadyMask, Reactor, Ticker, ZlibWriter};
use crate::plugins::PluginRegistry;
use crate::proto::{lock, CommandKind, Message};
use crate::security::flood::GlobalLimiter;
use crate::security::{Ban, BanKind, BanStore, CloneTracker, ConnectionFloodState, FloodVerdict};
use crate::state::user::{NetMode, Tag};
use crate::state::{make_bot, Class, MyInfo, Restrictions, Topic, User, UserCollection, HUB_SECURITY_NICK};
use crate::util::template::{self, TemplateContext};
use mio::Token;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const LISTENER_TOKEN: Token = Token(0);

/// Everything that exists for a connection before its nick is known (and,
/// once known, alongside its `User` entry in the collection).
struct ConnSlot {
    conn: Connection,
    zlib: ZlibWriter,
    flood: ConnectionFloodState,
    login: login::LoginSession,
    nick_hash: Option<u32>,
    ip: Ipv4Addr,
    proxy_ip: Option<Ipv4Addr>,
}

impl ConnSlot {
    fn flags_snapshot(&self) -> LoginFlagsSnapshot {
        LoginFlagsSnapshot {
            keyok: self.login.flags.keyok,
            valnick: self.login.flags.valnick,
            passwd: self.login.flags.passwd,
            myinfo: self.login.flags.myinfo,
            version: self.login.flags.version,
            allowed: self.login.flags.allowed,
            supports: self.login.flags.supports,
        }
    }

    fn effective_ip(&self) -> Ipv4Addr {
        self.proxy_ip.unwrap_or(self.ip)
    }
}

pub struct Server {
    config: Config,
    reactor: Reactor,
    gateway: Gateway,
    conns: HashMap<Token, ConnSlot>,
    next_token: usize,
    users: UserCollection,
    bans: BanStore,
    clones: CloneTracker,
    db: Database,
    geo: Box<dyn GeoLookup>,
    plugins: PluginRegistry,
    ticker: Ticker,
    sr_episodes: search::SrEpisodeCounter,
    topic: Topic,
    running: bool,
    /// Hub-wide per-bucket limiters, checked alongside each connection's
    /// own window (spec.md §4.10: "per-connection... and global per-type
    /// counters").
    global_flood: HashMap<String, GlobalLimiter>,
}

impl Server {
    pub fn new(config: Config, db: Database, geo: Box<dyn GeoLookup>) -> HubResult<Self> {
        let mut gateway = Gateway::bind(&config.server.listen_addr, config.server.listen_port)?;
        let mut reactor = Reactor::new(4096)?;
        reactor.add(gateway.listener_mut(), LISTENER_TOKEN, ReadyMask::INPUT)?;

        let now = Instant::now();
        let mut ticker = Ticker::new();
        ticker.register("ban_sweep", now, Duration::from_secs(config.timeouts.timer_conn_period_secs.max(1) * 15));

        let mut users = UserCollection::new();
        users.insert(make_bot(HUB_SECURITY_NICK, Class::Master, "hub security bot", config.nick.case_insensitive));

        let mut bans = BanStore::new();
        let now_unix = chrono::Utc::now().timestamp();
        for row in db.banlist().all_active(now_unix)? {
            if let Some(ban) = ban_from_row(&row) {
                bans.add(ban);
            }
        }

        let topic = Topic {
            text: config.server.topic.clone(),
            set_by: None,
        };

        let global_flood = config
            .limits
            .flood_rules
            .iter()
            .map(|(bucket, rule)| (bucket.clone(), crate::security::flood::global_limiter(rule.limit.max(1))))
            .collect();

        Ok(Self {
            config,
            reactor,
            gateway,
            conns: HashMap::new(),
            next_token: 1,
            users,
            bans,
            clones: CloneTracker::new(),
            db,
            geo,
            plugins: PluginRegistry::new(),
            ticker,
            sr_episodes: search::SrEpisodeCounter::new(),
            topic,
            running: false,
            global_flood,
        })
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn crate::plugins::HubPlugin>) {
        self.plugins.register(plugin);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn run(&mut self) -> HubResult<()> {
        self.running = true;
        info!(addr = %self.config.server.listen_addr, port = self.config.server.listen_port, "hub listening");
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// One iteration of the loop named in spec.md §5: `Choose(timeout)`,
    /// accept, read-and-dispatch every ready socket, run periodic jobs,
    /// then flush.
    pub fn step(&mut self) -> HubResult<()> {
        let ready = self.reactor.choose(Some(crate::net::reactor::DEFAULT_TIMEOUT))?;
        let now = Instant::now();

        for (token, mask) in ready {
            if token == LISTENER_TOKEN {
                self.accept_new(now);
                continue;
            }
            if mask.contains(ReadyMask::ERROR) {
                self.close_connection(token, CloseReason::Quit, now);
                continue;
            }
            if mask.contains(ReadyMask::OUTPUT) {
                if let Some(slot) = self.conns.get_mut(&token) {
                    let _ = slot.conn.on_writable();
                }
            }
            if mask.contains(ReadyMask::INPUT) {
                self.read_connection(token, now);
            }
        }

        self.run_timers(now);
        self.run_ticker(now);
        self.flush_send_all(now);
        self.flush_all_outbufs();
        self.sync_all_interest();
        Ok(())
    }

    /// Propagates each connection's `input_armed`/pending-output state to
    /// the reactor (spec.md §4.2/S6): INPUT removed at `max_outfill_size`,
    /// OUTPUT armed on a partial send, both corrected once per tick rather
    /// than after every individual write.
    fn sync_all_interest(&mut self) {
        for (token, slot) in self.conns.iter_mut() {
            if let Some(mask) = slot.conn.sync_interest() {
                let _ = self.reactor.reregister(slot.conn.stream_mut(), *token, mask);
            }
        }
    }

    fn accept_new(&mut self, now: Instant) {
        let accepted = match self.gateway.accept_all() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "accept failed");
                return;
            }
        };
        for (stream, ip) in accepted {
            if let Some(m) = self.bans.check(now, "", ip, None, 0) {
                info!(%ip, reason = %m.ban.reason, "rejecting connection from banned ip");
                continue;
            }
            let clone_count = self.clones.connect(ip);
            if clone_count >= self.config.security.clone_detect_count {
                warn!(%ip, count = clone_count, "clone flood detected");
                self.bans.temp_ban_ip(
                    ip,
                    "clone flood",
                    HUB_SECURITY_NICK,
                    BanKind::CloneDetect,
                    now,
                    Duration::from_secs(self.config.security.clone_det_tban_time_secs),
                );
                continue;
            }

            let token = Token(self.next_token);
            self.next_token += 1;
            let mut conn = Connection::new(
                token.0 as u64,
                stream,
                ip,
                self.config.limits.read_buf_size,
                self.config.limits.max_line_size,
            )
            .with_backpressure_limits(
                self.config.limits.max_outbuf_size,
                self.config.limits.max_outfill_size,
                self.config.limits.max_unblock_size,
            );
            conn.timers.key_deadline = Some(login::deadline(now, self.config.timeouts.key_secs));
            conn.timers.valnick_deadline = Some(login::deadline(now, self.config.timeouts.valnick_secs));
            conn.timers.login_deadline = Some(login::deadline(now, self.config.timeouts.login_secs));
            conn.timers.myinfo_deadline = Some(login::deadline(now, self.config.timeouts.myinfo_secs));
            conn.timers.setpass_deadline = Some(login::deadline(now, self.config.timeouts.setpass_secs));

            if let Err(e) = self.reactor.add(conn.stream_mut(), token, ReadyMask::INPUT) {
                warn!(error = %e, "failed to register new connection");
                continue;
            }

            let challenge = lock::generate_lock();
            let greeting = format!(
                "$Lock {challenge} Pk={hub}|$HubName {hub}|$Supports NickChange|",
                hub = self.config.server.hub_name,
            );
            let zlib = ZlibWriter::new(
                !self.config.zlib.disable_zlib,
                self.config.zlib.zlib_min_len,
                self.config.zlib.zlib_compress_level,
            );
            let mut slot = ConnSlot {
                conn,
                zlib,
                flood: ConnectionFloodState::new(),
                login: login::LoginSession::new(challenge),
                nick_hash: None,
                ip,
                proxy_ip: None,
            };
            let _ = slot.conn.write(greeting.as_bytes(), true, &mut slot.zlib);
            self.conns.insert(token, slot);

            self.plugins.on_connect(ip);
            crate::metrics::CONNECTIONS_TOTAL.inc();
            crate::metrics::CONNECTIONS_ACTIVE.inc();
        }
    }

    fn read_connection(&mut self, token: Token, now: Instant) {
        let Some(slot) = self.conns.get_mut(&token) else { return };
        match slot.conn.read_all() {
            Ok(_) => {}
            Err(reason) => {
                self.close_connection(token, reason, now);
                return;
            }
        }
        loop {
            let line = match self.conns.get_mut(&token) {
                Some(slot) => slot.conn.read_line_local(),
                None => return,
            };
            match line {
                Ok(Some(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    self.dispatch_line(token, &text, now);
                    if !self.conns.contains_key(&token) {
                        return;
                    }
                }
                Ok(None) => break,
                Err(reason) => {
                    self.close_connection(token, reason, now);
                    return;
                }
            }
        }
    }

    /// Classify and route one framed line. Splits on login-phase vs.
    /// post-login dispatch, per spec.md §4.3/§4.6-4.8.
    fn dispatch_line(&mut self, token: Token, line: &str, now: Instant) {
        let kind = search::normalize_multi_search(crate::proto::command::classify(line));
        let limits = self.config.limits.clone();

        let bucket = flood_bucket(kind);
        if let Some(rule) = limits.flood_rules.get(bucket) {
            let logged_in_hash = self.conns.get(&token).and_then(|s| s.nick_hash);
            let exempt = logged_in_hash
                .and_then(|h| self.users.get(h))
                .is_some_and(|u| u.class.as_u8() >= self.config.security.max_class_proto_flood);

            if !exempt {
                let mut verdict = match self.conns.get_mut(&token) {
                    Some(slot) => slot.flood.check(bucket, rule, now),
                    None => return,
                };
                if verdict == FloodVerdict::Allow && self.global_flood.get(bucket).is_some_and(|l| l.check().is_err()) {
                    verdict = match rule.action {
                        FloodAction::Report => FloodVerdict::Report,
                        FloodAction::Skip => FloodVerdict::Skip,
                        FloodAction::Drop => FloodVerdict::Drop,
                        FloodAction::Ban => FloodVerdict::Ban,
                    };
                }
                crate::metrics::MESSAGES_TOTAL.with_label_values(&[kind.name()]).inc();
                match verdict {
                    FloodVerdict::Allow => {}
                    FloodVerdict::Skip => return,
                    FloodVerdict::Drop => {
                        self.close_connection(token, CloseReason::Flood(bucket_static(bucket)), now);
                        return;
                    }
                    FloodVerdict::Report => {
                        warn!(?token, bucket, "flood threshold hit, reporting only");
                    }
                    FloodVerdict::Ban => {
                        self.ban_connection(token, "protocol flood", now);
                        return;
                    }
                }
            }
        }

        let is_logged_in = self.conns.get(&token).is_some_and(|s| s.nick_hash.is_some());
        if is_logged_in {
            self.dispatch_post_login(token, kind, line, now);
        } else {
            self.dispatch_login_phase(token, kind, line, now);
        }
    }

    fn dispatch_login_phase(&mut self, token: Token, kind: CommandKind, line: &str, now: Instant) {
        let msg = match Message::parse(strip_kind_prefix(kind, line), &self.config.limits) {
            Ok(m) => m,
            Err(_) => return,
        };
        match kind {
            CommandKind::Key => self.on_key(token, &msg, now),
            CommandKind::ValidateNick => self.on_validate_nick(token, &msg, now),
            CommandKind::MyPass => self.on_mypass(token, &msg, now),
            CommandKind::Version => {
                if let Some(slot) = self.conns.get_mut(&token) {
                    slot.login.on_version();
                }
            }
            CommandKind::Supports => {
                if let Some(slot) = self.conns.get_mut(&token) {
                    slot.login.on_supports(0);
                }
            }
            CommandKind::GetNickList => self.on_get_nick_list(token),
            CommandKind::MyInfo => self.on_myinfo(token, &msg, now),
            CommandKind::MyIp => self.on_myip(token, &msg),
            CommandKind::Quit => self.close_connection(token, CloseReason::Quit, now),
            _ => {}
        }
        self.maybe_finish_login(token, now);
    }

    fn on_key(&mut self, token: Token, msg: &Message, now: Instant) {
        let Some(slot) = self.conns.get_mut(&token) else { return };
        let candidate = msg.chunk_or_empty(0);
        if lock::validate_key(&slot.login.challenge, candidate) {
            slot.login.on_key_ok();
        } else {
            self.close_connection(token, CloseReason::ProtocolError("bad key".into()), now);
        }
    }

    fn on_validate_nick(&mut self, token: Token, msg: &Message, now: Instant) {
        let nick = msg.chunk_or_empty(0).to_string();
        let config = &self.config;
        let bot_names = [HUB_SECURITY_NICK];
        if let Err(reason) = login::validate_nick(&nick, config, |n| bot_names.contains(&n)) {
            self.reject_login(token, &format!("$ValidateDenide {nick}|"), reason, now);
            return;
        }
        let hash = crate::util::hash::nick_hash(&nick, config.nick.case_insensitive, config.nick.strip_prefix.as_deref());
        if self.users.contains_hash(hash) {
            self.reject_login(token, &format!("$ValidateDenide {nick}|"), "nick already in use", now);
            return;
        }
        if let Some(m) = self.conns.get(&token).map(|s| s.effective_ip()).and_then(|ip| self.bans.check(now, &nick, ip, None, 0)) {
            let reason = m.ban.reason.clone();
            self.reject_login(token, &format!("$ValidateDenide {nick}|"), &reason, now);
            return;
        }

        let registered = self.db.reglist().find(&nick).unwrap_or(None);
        let Some(slot) = self.conns.get_mut(&token) else { return };
        slot.login.nick = Some(nick.clone());
        slot.login.flags.valnick = true;

        if let Some(reg) = registered {
            let _ = slot.conn.write(b"$GetPass|", true, &mut slot.zlib);
            slot.login.state = login::LoginState::AwaitingPassword;
            // Stash the expected credential on the session via a side
            // lookup at $MyPass time instead of here: reglist rows aren't
            // cheap to carry around per-connection, and the password
            // check re-queries by nick.
            let _ = reg;
        } else {
            slot.login.on_password_match();
        }
    }

    fn on_mypass(&mut self, token: Token, msg: &Message, now: Instant) {
        let candidate = msg.chunk_or_empty(0);
        let Some(nick) = self.conns.get(&token).and_then(|s| s.login.nick.clone()) else {
            return;
        };
        let reg = self.db.reglist().find(&nick).unwrap_or(None);
        let ok = reg.as_ref().is_some_and(|r| verify_password(&r.password, r.encryption, candidate));
        let Some(slot) = self.conns.get_mut(&token) else { return };
        if ok {
            slot.login.on_password_match();
        } else {
            let ban_ttl = slot.login.on_password_mismatch(&self.config);
            let _ = slot.conn.write(b"$BadPass|", true, &mut slot.zlib);
            self.bans.temp_ban_ip(
                self.conns[&token].ip,
                "password mismatch",
                HUB_SECURITY_NICK,
                BanKind::PasswordFail,
                now,
                ban_ttl,
            );
            self.close_connection(token, CloseReason::ProtocolError("bad password".into()), now);
        }
    }

    fn on_get_nick_list(&mut self, token: Token) {
        if let Some(slot) = self.conns.get_mut(&token) {
            slot.login.on_get_nick_list();
            let list = self.users.nick_list("$$").to_string();
            if let Some(slot) = self.conns.get_mut(&token) {
                let _ = slot.conn.write(list.as_bytes(), true, &mut slot.zlib);
            }
        }
    }

    fn on_myip(&mut self, token: Token, msg: &Message) {
        if let Some(proxy) = crate::net::myip::parse(msg.chunk_or_empty(0), msg.chunk_or_empty(1)) {
            if let Some(slot) = self.conns.get_mut(&token) {
                slot.proxy_ip = Some(proxy.addr);
            }
        }
    }

    fn on_myinfo(&mut self, token: Token, msg: &Message, now: Instant) {
        let tag = parse_myinfo_tag(msg.chunk_or_empty(1));
        let share: u64 = msg.chunk_or_empty(4).parse().unwrap_or(0);
        let class = self
            .conns
            .get(&token)
            .and_then(|s| s.login.nick.as_deref())
            .and_then(|nick| self.db.reglist().find(nick).ok().flatten())
            .map(|r| Class::from_u8(r.class))
            .unwrap_or(Class::NormUser);

        let admission_info = admission::MyInfoAdmission {
            class,
            share,
            mode: tag.mode,
            hubs_reg: tag.hubs_reg,
            hubs_op: tag.hubs_op,
            hubs_unreg: tag.hubs_unreg,
            slots: tag.slots,
            client_version: Some(tag.client_version.as_str()).filter(|s| !s.is_empty()),
        };
        if let Err(err) = admission::check(&admission_info, &self.config) {
            self.reject_login(token, "", &format!("{err:?}"), now);
            return;
        }

        let is_logged_in = self.conns.get(&token).is_some_and(|s| s.nick_hash.is_some());
        if is_logged_in {
            // MyINFO refresh after login: update the existing user entry.
            if let Some(hash) = self.conns.get(&token).and_then(|s| s.nick_hash) {
                if let Some(user) = self.users.get_mut(hash) {
                    user.myinfo = MyInfo {
                        description: msg.chunk_or_empty(1).to_string(),
                        tag,
                        speed: msg.chunk_or_empty(2).to_string(),
                        email: msg.chunk_or_empty(3).to_string(),
                        share,
                    };
                }
                let payload = format!("{}|", msg.to_wire());
                self.users.append_to_cache(payload.as_bytes());
            }
            return;
        }

        let Some(slot) = self.conns.get_mut(&token) else { return };
        let first = slot.login.on_myinfo();
        if !first {
            return;
        }
        let nick = slot.login.nick.clone().unwrap_or_default();
        let hash = crate::util::hash::nick_hash(&nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref());
        let ip = slot.effective_ip();

        let user = User {
            nick: nick.clone(),
            nick_hash: hash,
            class,
            myinfo: MyInfo {
                description: msg.chunk_or_empty(1).to_string(),
                tag,
                speed: msg.chunk_or_empty(2).to_string(),
                email: msg.chunk_or_empty(3).to_string(),
                share,
            },
            ext_json: None,
            registered: class >= Class::RegUser,
            restrictions: Restrictions::default(),
            in_list: true,
            chat_enabled: true,
            connection_id: Some(token.0 as u64),
            ip: Some(ip),
            features: slot.login.features,
            my_flags: 0,
        };
        slot.nick_hash = Some(hash);
        slot.login.mark_allowed();
        self.users.insert(user);

        // Announce the newcomer to everyone already in the user list
        // (spec.md §8 S1: bob learns alice joined via her $Hello/$MyINFO).
        let hello = format!("$Hello {nick}|");
        self.users.append_to_cache(hello.as_bytes());
        let myinfo_line = format!("{}|", msg.to_wire());
        self.users.append_to_cache(myinfo_line.as_bytes());

        let _ = self.db.reglist().touch_login(&nick, chrono::Utc::now().timestamp());
        let country = self.geo.lookup(ip);
        let _ = self.db.zone().increment(&country.country_code, &country.country_name);
        self.plugins.on_first_myinfo(self.users.get(hash).expect("just inserted"));
    }

    fn maybe_finish_login(&mut self, token: Token, now: Instant) {
        let Some(slot) = self.conns.get_mut(&token) else { return };
        if !slot.login.flags.login_done() {
            return;
        }
        let nick = slot.login.nick.clone().unwrap_or_default();
        let ctx = self
            .users
            .get(slot.nick_hash.unwrap_or_default())
            .map(|user| {
                let country = self.geo.lookup(user.ip.unwrap_or(Ipv4Addr::UNSPECIFIED));
                TemplateContext {
                    class: user.class.as_u8().to_string(),
                    class_name: user.class.name().to_string(),
                    country_code: country.country_code,
                    country_name: country.country_name,
                    city: country.city,
                    mode: user
                        .myinfo
                        .tag
                        .mode
                        .map(|m| match m {
                            NetMode::Active => "A",
                            NetMode::Passive => "P",
                            NetMode::Sock5 => "5",
                        })
                        .unwrap_or("?")
                        .to_string(),
                    pattern: self.config.server.hub_name.clone(),
                    nick: nick.clone(),
                }
            })
            .unwrap_or_else(|| TemplateContext {
                class: String::new(),
                class_name: String::new(),
                country_code: String::new(),
                country_name: String::new(),
                city: String::new(),
                mode: String::new(),
                pattern: self.config.server.hub_name.clone(),
                nick: nick.clone(),
            });
        let hello = format!("$Hello {nick}|");
        let op_list = if self.config.server.send_oplist_on_login {
            self.users.op_list("$$").to_string()
        } else {
            String::new()
        };
        let welcome = render_welcome(&self.config, &ctx);
        let myinfo_batch = self.users.myinfo_batch().to_string();
        let topic_line = if self.topic.text.is_empty() {
            String::new()
        } else {
            format!("<{HUB_SECURITY_NICK}> Topic: {}|", self.topic.text)
        };
        let Some(slot) = self.conns.get_mut(&token) else { return };
        let _ = slot.conn.write(hello.as_bytes(), false, &mut slot.zlib);
        if !op_list.is_empty() {
            let _ = slot.conn.write(op_list.as_bytes(), false, &mut slot.zlib);
        }
        let _ = slot.conn.write(welcome.as_bytes(), false, &mut slot.zlib);
        let _ = slot.conn.write(myinfo_batch.as_bytes(), false, &mut slot.zlib);
        let _ = slot.conn.write(topic_line.as_bytes(), true, &mut slot.zlib);
        let _ = now;
        info!(nick = slot.login.nick.as_deref().unwrap_or(""), "user logged in");
    }

    fn reject_login(&mut self, token: Token, wire_message: &str, reason: &str, now: Instant) {
        if let Some(slot) = self.conns.get_mut(&token) {
            if !wire_message.is_empty() {
                let _ = slot.conn.write(wire_message.as_bytes(), true, &mut slot.zlib);
            }
        }
        self.close_connection(token, CloseReason::ProtocolError(reason.to_string()), now);
    }

    fn dispatch_post_login(&mut self, token: Token, kind: CommandKind, line: &str, now: Instant) {
        let Some(hash) = self.conns.get(&token).and_then(|s| s.nick_hash) else { return };
        let msg = match Message::parse(strip_kind_prefix(kind, line), &self.config.limits) {
            Ok(m) => m,
            Err(_) => return,
        };
        match kind {
            CommandKind::Chat => self.on_chat(hash, &msg, now),
            CommandKind::To => self.on_pm(token, hash, &msg, now, false),
            CommandKind::MCTo => self.on_pm(token, hash, &msg, now, true),
            CommandKind::Search | CommandKind::SearchHub => self.on_search(token, hash, kind, &msg, now),
            CommandKind::SR => self.on_sr(&msg),
            CommandKind::ConnectToMe | CommandKind::MultiConnectToMe => self.on_ctm(hash, &msg),
            CommandKind::RevConnectToMe => self.on_rctm(hash, &msg),
            CommandKind::MyInfo => self.on_myinfo(token, &msg, now),
            CommandKind::GetTopic => self.send_to_connection(token, &format!("$GetTopic {}|", self.topic.text)),
            CommandKind::SetTopic => self.on_settopic(hash, &msg),
            CommandKind::MyIp => self.on_myip(token, &msg),
            CommandKind::Quit => self.close_connection(token, CloseReason::Quit, now),
            _ => {}
        }
    }

    fn on_chat(&mut self, sender_hash: u32, msg: &Message, now: Instant) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        if chat::check_can_send(sender, now).is_err() {
            return;
        }
        let line = chat::format_main_chat(&sender.nick, msg.chunk_or_empty(1));
        self.users.append_to_cache(line.as_bytes());
    }

    fn on_pm(&mut self, token: Token, sender_hash: u32, msg: &Message, now: Instant, main_chat_style: bool) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        if chat::check_can_send(sender, now).is_err() {
            return;
        }
        let sender_class = sender.class;
        let sender_nick = sender.nick.clone();
        let to_nick = msg.chunk_or_empty(0).to_string();
        let body = msg.chunk_or_empty(2).to_string();

        let pm_limit = self.config.flood.max_flood_counter_pm;
        let pm_window = Duration::from_secs(self.config.flood.same_flood_ban_time_secs);
        let repeated = match self.conns.get_mut(&token) {
            Some(slot) => slot.flood.record_pm_repetition(&body, pm_limit, pm_window, now),
            None => false,
        };
        if repeated {
            self.ban_connection(token, "pm repetition flood", now);
            return;
        }

        let Some(dest) = self.users.get_by_nick(&to_nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref()) else {
            return;
        };
        let max_diff = self.config.security.classdif_pm;
        if chat::check_class_diff(sender_class, dest.class, max_diff).is_err() {
            return;
        }
        let dest_conn_id = dest.connection_id;
        let wire = if main_chat_style {
            chat::format_mcto(&to_nick, &sender_nick, &body)
        } else {
            chat::format_to(&to_nick, &sender_nick, &body)
        };
        if let Some(conn_id) = dest_conn_id {
            self.send_to_raw(conn_id, wire.as_bytes());
        }
        if sender_class.is_operator_or_above() {
            if let Ok(cmd) = opcmd::parse(&body, sender_class) {
                self.run_opcmd(sender_hash, cmd, now);
            }
        }
    }

    fn on_search(&mut self, token: Token, sender_hash: u32, kind: CommandKind, msg: &Message, now: Instant) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        let dest_chunk = msg.chunk_or_empty(0);
        let pattern = msg.chunk_or_empty(msg.chunk_count().saturating_sub(1));
        let destination = match kind {
            CommandKind::SearchHub => {
                if search::validate_active_search(&format!("{}:0", sender.ip.unwrap_or(Ipv4Addr::UNSPECIFIED)), pattern, false, self.config.limits.min_search_chars).is_err() {
                    return;
                }
                search::SearchDestination::Passive
            }
            _ => {
                if search::validate_active_search(dest_chunk, pattern, self.config.security.filter_lan_requests, self.config.limits.min_search_chars).is_err() {
                    return;
                }
                search::SearchDestination::Active
            }
        };
        if self.plugins.on_search(sender, msg) {
            let wire = format!("{}|", msg.to_wire());
            match destination {
                // Every member gets an active search: the sender declared
                // a reachable address, so there's no need to restrict
                // delivery to active-mode clients only.
                search::SearchDestination::Active => self.users.append_to_cache(wire.as_bytes()),
                // A passive search only makes sense to active-mode peers,
                // who can actually open the resulting $ConnectToMe.
                search::SearchDestination::Passive => {
                    for conn in self.users.iter().filter_map(|u| u.connection_id).collect::<Vec<_>>() {
                        self.send_to_raw(conn, wire.as_bytes());
                    }
                }
            }
        }
        let _ = (token, now);
    }

    fn on_sr(&mut self, msg: &Message) {
        let to_nick = msg.chunk_or_empty(7);
        let episode_key = format!("{}:{}", to_nick, msg.chunk_or_empty(1));
        if !self.sr_episodes.admit(&episode_key, self.config.limits.max_passive_sr) {
            return;
        }
        if let Some(dest) = self.users.get_by_nick(to_nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref()) {
            if let Some(conn_id) = dest.connection_id {
                let wire = format!("{}|", msg.to_wire());
                self.send_to_raw(conn_id, wire.as_bytes());
            }
        }
    }

    fn on_ctm(&mut self, sender_hash: u32, msg: &Message) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        let addr = format!("{}:{}", msg.chunk_or_empty(1), msg.chunk_or_empty(2));
        let dest_nick = msg.chunk_or_empty(0);
        let dest = self.users.get_by_nick(dest_nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref());
        let hub_addr = &self.config.server.listen_addr;
        let hub_port = self.config.server.listen_port;
        let outcome = ctm::classify_ctm(
            &addr,
            hub_addr,
            hub_port,
            &sender.nick,
            dest_nick,
            dest.is_some(),
            dest.is_some_and(|d| d.is_bot()),
        );
        if outcome == ctm::CtmOutcome::Relay {
            if self.plugins.on_ctm(sender, msg) {
                if let Some(conn_id) = dest.and_then(|d| d.connection_id) {
                    let wire = format!("{}|", msg.to_wire());
                    self.send_to_raw(conn_id, wire.as_bytes());
                }
            }
        } else if let Some(text) = ctm::error_message(outcome, self.config.security.hide_msg_badctm) {
            if let Some(conn_id) = sender.connection_id {
                let line = format!("<{HUB_SECURITY_NICK}> {text}|");
                self.send_to_raw(conn_id, line.as_bytes());
            }
        }
    }

    fn on_rctm(&mut self, sender_hash: u32, msg: &Message) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        let dest_nick = msg.chunk_or_empty(0);
        if let Some(dest) = self.users.get_by_nick(dest_nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref()) {
            if let Some(conn_id) = dest.connection_id {
                let wire = format!("$RevConnectToMe {} {}|", sender.nick, dest_nick);
                self.send_to_raw(conn_id, wire.as_bytes());
            }
        }
    }

    fn on_settopic(&mut self, sender_hash: u32, msg: &Message) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        if !sender.class.is_operator_or_above() {
            return;
        }
        self.topic.text = msg.chunk_or_empty(0).to_string();
        self.topic.set_by = Some(sender.nick.clone());
        let line = format!("$SetTopic {}|", self.topic.text);
        self.users.append_to_cache(line.as_bytes());
    }

    fn run_opcmd(&mut self, sender_hash: u32, cmd: opcmd::OpCommand, now: Instant) {
        let Some(sender) = self.users.get(sender_hash) else { return };
        let operator_nick = sender.nick.clone();
        match cmd {
            opcmd::OpCommand::Kick { nick, reason } => {
                let _ = self.db.banlist().record_kick(&nick, &operator_nick, &reason, chrono::Utc::now().timestamp());
                self.kick_by_nick(&nick, &reason, now);
            }
            opcmd::OpCommand::Ban { nick, reason } => {
                self.bans.add(Ban {
                    nick: Some(nick.clone()),
                    ip: None,
                    ip_range: None,
                    host: None,
                    min_share: None,
                    reason: reason.clone(),
                    operator: operator_nick.clone(),
                    kind: BanKind::Permanent,
                    start: now,
                    end: None,
                });
                self.kick_by_nick(&nick, &reason, now);
            }
            opcmd::OpCommand::TempBan { nick, duration, reason } => {
                self.bans.temp_ban_nick(&nick, &reason, &operator_nick, BanKind::TempByNick, now, duration);
                self.kick_by_nick(&nick, &reason, now);
            }
            opcmd::OpCommand::UnBan { nick } => {
                self.bans.unban_nick(&nick);
            }
            opcmd::OpCommand::Topic { text } => {
                self.topic.text = text.clone();
                self.topic.set_by = Some(operator_nick);
                let line = format!("$SetTopic {text}|");
                self.users.append_to_cache(line.as_bytes());
            }
        }
    }

    fn kick_by_nick(&mut self, nick: &str, reason: &str, now: Instant) {
        let Some(user) = self.users.get_by_nick(nick, self.config.nick.case_insensitive, self.config.nick.strip_prefix.as_deref()) else {
            return;
        };
        let Some(conn_id) = user.connection_id else { return };
        let token = Token(conn_id as usize);
        let notice = format!("<{HUB_SECURITY_NICK}> You were kicked: {reason}|");
        self.send_to_raw(conn_id, notice.as_bytes());
        self.close_connection(token, CloseReason::Kicked(reason.to_string()), now);
    }

    fn ban_connection(&mut self, token: Token, reason: &str, now: Instant) {
        let ip = self.conns.get(&token).map(|s| s.effective_ip());
        if let Some(ip) = ip {
            self.bans.temp_ban_ip(ip, reason, HUB_SECURITY_NICK, BanKind::Flood, now, Duration::from_secs(self.config.flood.proto_flood_tban_time_secs));
        }
        self.close_connection(token, CloseReason::Flood("protocol"), now);
    }

    fn send_to_connection(&mut self, token: Token, wire: &str) {
        if let Some(slot) = self.conns.get_mut(&token) {
            let _ = slot.conn.write(wire.as_bytes(), true, &mut slot.zlib);
        }
    }

    /// Writes directly into one connection's buffer, bypassing the
    /// once-per-tick send-all cache (spec.md §4.12: used by every fan-out
    /// primitive narrower than `SendToAll`).
    fn send_to_raw(&mut self, conn_id: u64, data: &[u8]) {
        let token = Token(conn_id as usize);
        if let Some(slot) = self.conns.get_mut(&token) {
            let _ = slot.conn.write(data, true, &mut slot.zlib);
        }
    }

    /// Flushes the accumulated `SendToAll` cache to every current member,
    /// exactly once per tick (spec.md §4.12/§9).
    fn flush_send_all(&mut self, _now: Instant) {
        let (payload, targets) = self.users.drain_send_all_cache();
        if payload.is_empty() {
            return;
        }
        for conn_id in targets {
            let token = Token(conn_id as usize);
            if let Some(slot) = self.conns.get_mut(&token) {
                let _ = slot.conn.write(&payload, true, &mut slot.zlib);
            }
        }
    }

    fn flush_all_outbufs(&mut self) {
        for (token, slot) in self.conns.iter_mut() {
            if slot.conn.pending_send_bytes() > 0 {
                let _ = slot.conn.write(b"", true, &mut slot.zlib);
            }
            let _ = token;
        }
    }

    fn run_timers(&mut self, now: Instant) {
        let mut to_close = Vec::new();
        for (token, slot) in self.conns.iter_mut() {
            let flags = slot.flags_snapshot();
            if let Some(reason) = slot.conn.on_timer_base(now, flags) {
                to_close.push((*token, reason));
            } else if matches!(slot.conn.close_state, crate::net::connection::CloseState::CloseNow) {
                to_close.push((*token, CloseReason::Quit));
            }
        }
        for (token, reason) in to_close {
            self.close_connection(token, reason, now);
        }
    }

    fn run_ticker(&mut self, now: Instant) {
        for job in self.ticker.due_jobs(now) {
            if job == "ban_sweep" {
                self.bans.sweep(now);
            }
        }
    }

    fn close_connection(&mut self, token: Token, reason: CloseReason, _now: Instant) {
        let Some(mut slot) = self.conns.remove(&token) else { return };
        let _ = self.reactor.remove(slot.conn.stream_mut());
        self.clones.disconnect(slot.ip);
        crate::metrics::CONNECTIONS_ACTIVE.dec();
        if let Some(hash) = slot.nick_hash {
            if let Some(user) = self.users.remove_by_hash(hash) {
                let country = self.geo.lookup(user.ip.unwrap_or(Ipv4Addr::UNSPECIFIED));
                let _ = self.db.zone().decrement(&country.country_code);
                let quit_line = format!("$Quit {}|", user.nick);
                self.users.append_to_cache(quit_line.as_bytes());
            }
        }
        info!(?token, reason = %reason, "connection closed");
    }
}

fn ban_from_row(row: &crate::db::BanRow) -> Option<Ban> {
    let kind = match row.kind.as_str() {
        "permanent" => BanKind::Permanent,
        "tempbynick" => BanKind::TempByNick,
        "tempbyip" => BanKind::TempByIp,
        "passwordfail" => BanKind::PasswordFail,
        "clonedetect" => BanKind::CloneDetect,
        _ => BanKind::Flood,
    };
    let now = Instant::now();
    let end = row.end_ts.map(|ts| {
        let remaining = (ts - chrono::Utc::now().timestamp()).max(0) as u64;
        now + Duration::from_secs(remaining)
    });
    Some(Ban {
        nick: row.nick.clone(),
        ip: row.ip.as_deref().and_then(|s| s.parse().ok()),
        ip_range: row.ip_range.as_deref().and_then(|s| s.parse().ok()),
        host: row.host.clone(),
        min_share: row.min_share,
        reason: row.reason.clone(),
        operator: row.operator.clone(),
        kind,
        start: now,
        end,
    })
}

fn verify_password(stored: &str, kind: crate::db::CredentialKind, candidate: &str) -> bool {
    use crate::db::CredentialKind;
    match kind {
        CredentialKind::Plain | CredentialKind::Legacy => stored == candidate,
        CredentialKind::Md5 => {
            use md5::{Digest, Md5};
            let mut hasher = Md5::new();
            hasher.update(candidate.as_bytes());
            let digest = hasher.finalize();
            stored.eq_ignore_ascii_case(&hex_encode(&digest))
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn flood_bucket(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Search | CommandKind::SearchHub | CommandKind::MultiSearch => "search",
        CommandKind::Chat => "chat",
        CommandKind::To | CommandKind::MCTo => "pm",
        CommandKind::ConnectToMe | CommandKind::MultiConnectToMe | CommandKind::RevConnectToMe => "ctm",
        CommandKind::Unknown => "unknown",
        _ => "unknown",
    }
}

fn bucket_static(bucket: &str) -> &'static str {
    match bucket {
        "search" => "search",
        "chat" => "chat",
        "pm" => "pm",
        "ctm" => "ctm",
        _ => "unknown",
    }
}

/// Strips the leading command token so `Message::parse` sees the same
/// shape `proto::chunks::split` expects (the whole line, token included —
/// `Message::parse` re-classifies internally, so this is a passthrough
/// kept for call-site clarity at dispatch time).
fn strip_kind_prefix(_kind: CommandKind, line: &str) -> &str {
    line
}

fn parse_myinfo_tag(description: &str) -> Tag {
    let mut tag = Tag::default();
    let Some(open) = description.find('<') else { return tag };
    let Some(close) = description[open..].find('>') else { return tag };
    let inner = &description[open + 1..open + close];
    let mut parts = inner.splitn(2, ' ');
    tag.client_name = parts.next().unwrap_or("").to_string();
    let fields = parts.next().unwrap_or("");
    for field in fields.split(',') {
        let Some((key, value)) = field.split_once(':') else { continue };
        match key {
            "V" => tag.client_version = value.to_string(),
            "M" => {
                tag.mode = match value {
                    "A" => Some(NetMode::Active),
                    "P" => Some(NetMode::Passive),
                    "5" => Some(NetMode::Sock5),
                    _ => None,
                }
            }
            "H" => {
                let mut hubs = value.split('/').filter_map(|v| v.parse().ok());
                tag.hubs_reg = hubs.next().unwrap_or(0);
                tag.hubs_op = hubs.next().unwrap_or(0);
                tag.hubs_unreg = hubs.next().unwrap_or(0);
            }
            "S" => tag.slots = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    tag
}

fn render_welcome(config: &Config, ctx: &TemplateContext) -> String {
    let text = template::substitute(&config.server.welcome_template, ctx);
    format!("<{HUB_SECURITY_NICK}> {text}|")
}

impl From<crate::db::DbError> for HubError {
    fn from(e: crate::db::DbError) -> Self {
        match e {
            crate::db::DbError::Sqlite(err) => HubError::Db(err),
            other => HubError::Config(other.to_string()),
        }
    }
}
