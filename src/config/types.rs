use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub hub_name: String,
    pub hub_description: String,
    pub topic: String,
    pub listen_port: u16,
    pub listen_addr: String,
    pub log_format: LogFormat,
    pub send_nicklist_on_login: bool,
    pub send_oplist_on_login: bool,
    pub send_botlist_on_login: bool,
    pub welcome_template: String,
    pub myinfo_prefix_template: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hub_name: "Unnamed Hub".to_string(),
            hub_description: String::new(),
            topic: String::new(),
            listen_port: 4111,
            listen_addr: "0.0.0.0".to_string(),
            log_format: LogFormat::Pretty,
            send_nicklist_on_login: true,
            send_oplist_on_login: true,
            send_botlist_on_login: false,
            welcome_template: "Welcome %[nick] to %[pattern]!".to_string(),
            myinfo_prefix_template: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    /// Operators at or above this class bypass ban checks (spec.md §4.9).
    pub ban_bypass_class: u8,
    pub max_class_proto_flood: u8,
    /// Max class difference a `$To`/`$MCTo` may cross (spec.md §4.6).
    pub classdif_pm: u8,
    pub clone_detect_count: u32,
    pub clone_det_tban_time_secs: u64,
    pub pwd_tmpban_secs: u64,
    pub pwd_tmpban_multiplier: u32,
    pub filter_lan_requests: bool,
    pub hide_msg_badctm: bool,
    pub detect_ctmtohub: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            ban_bypass_class: 4, // operator
            max_class_proto_flood: 4,
            classdif_pm: 7,
            clone_detect_count: 3,
            clone_det_tban_time_secs: 600,
            pwd_tmpban_secs: 1800,
            pwd_tmpban_multiplier: 2,
            filter_lan_requests: true,
            hide_msg_badctm: false,
            detect_ctmtohub: true,
        }
    }
}

/// Per-phase login timeouts (spec.md §4.3, §4.2, §5), in seconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutConfig {
    pub key_secs: u64,
    pub valnick_secs: u64,
    pub login_secs: u64,
    pub myinfo_secs: u64,
    pub flush_secs: u64,
    pub setpass_secs: u64,
    pub timer_conn_period_secs: u64,
    pub adv_conn_choose_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            key_secs: 60,
            valnick_secs: 30,
            login_secs: 600,
            myinfo_secs: 40,
            flush_secs: 30,
            setpass_secs: 300,
            timer_conn_period_secs: 4,
            adv_conn_choose_timeout_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NickConfig {
    pub min_len: usize,
    pub max_len: usize,
    pub forbidden_chars: String,
    pub case_insensitive: bool,
    pub strip_prefix: Option<String>,
    pub reserved: Vec<String>,
}

impl Default for NickConfig {
    fn default() -> Self {
        Self {
            min_len: 1,
            max_len: 32,
            forbidden_chars: "$|<>".to_string(),
            case_insensitive: true,
            strip_prefix: None,
            reserved: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TagConfig {
    pub show_tags: bool,
    pub min_hubs: u32,
    pub max_hubs: u32,
    pub hub_slot_ratio: f32,
    pub allow_none: bool,
    pub allow_unknown: bool,
    pub allow_passive: bool,
    pub allow_sock5: bool,
    pub min_client_version: Option<String>,
    pub max_client_version: Option<String>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            show_tags: true,
            min_hubs: 0,
            max_hubs: 50,
            hub_slot_ratio: 0.0,
            allow_none: true,
            allow_unknown: true,
            allow_passive: true,
            allow_sock5: true,
            min_client_version: None,
            max_client_version: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FloodConfig {
    pub proto_flood_report_time_secs: u64,
    pub proto_flood_tban_time_secs: u64,
    pub max_flood_counter_pm: u32,
    pub same_flood_ban_time_secs: u64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            proto_flood_report_time_secs: 60,
            proto_flood_tban_time_secs: 1800,
            max_flood_counter_pm: 3,
            same_flood_ban_time_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ZlibConfig {
    pub disable_zlib: bool,
    pub zlib_min_len: usize,
    pub zlib_compress_level: u32,
}

impl Default for ZlibConfig {
    fn default() -> Self {
        Self {
            disable_zlib: false,
            zlib_min_len: 1024,
            zlib_compress_level: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub path: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: "verlicore.db".to_string(),
        }
    }
}
