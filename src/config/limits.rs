use serde::Deserialize;
use std::collections::HashMap;

/// Actions a flood limiter can take once a per-type limit is exceeded
/// (spec.md §4.10).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FloodAction {
    Report,
    Skip,
    Drop,
    Ban,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct FloodRule {
    pub period_secs: u64,
    pub limit: u32,
    pub action: FloodAction,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    /// Fixed scratch-buffer capacity for socket reads (spec.md §4.2).
    pub read_buf_size: usize,
    pub max_outbuf_size: usize,
    pub max_outfill_size: usize,
    pub max_unblock_size: usize,

    pub max_line_size: usize,
    pub max_len_myinfo: usize,
    pub max_len_in: usize,
    pub max_len_extjson: usize,
    pub max_len_supports: usize,
    pub max_len_search: usize,

    pub min_share_size: u64,
    pub max_share_size: u64,
    pub passive_share_multiplier: f32,

    pub min_search_chars: usize,
    pub max_passive_sr: u32,

    pub min_class_use_hub: u8,
    pub min_class_use_hub_passive: u8,
    pub min_share_use_hub: u64,
    pub min_share_use_hub_reg: u64,
    pub min_share_use_hub_vip: u64,

    pub flood_rules: HashMap<String, FloodRule>,
}

impl Default for Limits {
    fn default() -> Self {
        let mut flood_rules = HashMap::new();
        flood_rules.insert(
            "search".to_string(),
            FloodRule {
                period_secs: 60,
                limit: 30,
                action: FloodAction::Ban,
            },
        );
        flood_rules.insert(
            "chat".to_string(),
            FloodRule {
                period_secs: 10,
                limit: 10,
                action: FloodAction::Skip,
            },
        );
        flood_rules.insert(
            "pm".to_string(),
            FloodRule {
                period_secs: 10,
                limit: 10,
                action: FloodAction::Skip,
            },
        );
        flood_rules.insert(
            "ctm".to_string(),
            FloodRule {
                period_secs: 10,
                limit: 10,
                action: FloodAction::Drop,
            },
        );
        flood_rules.insert(
            "unknown".to_string(),
            FloodRule {
                period_secs: 60,
                limit: 10,
                action: FloodAction::Drop,
            },
        );

        Self {
            read_buf_size: 512 * 1024 + 1,
            max_outbuf_size: 1024 * 1024,
            max_outfill_size: 768 * 1024,
            max_unblock_size: 512 * 1024,

            max_line_size: 64 * 1024,
            max_len_myinfo: 8 * 1024,
            max_len_in: 4 * 1024,
            max_len_extjson: 16 * 1024,
            max_len_supports: 1024,
            max_len_search: 1024,

            min_share_size: 0,
            max_share_size: u64::MAX,
            passive_share_multiplier: 1.0,

            min_search_chars: 1,
            max_passive_sr: 25,

            min_class_use_hub: 0,
            min_class_use_hub_passive: 0,
            min_share_use_hub: 0,
            min_share_use_hub_reg: 0,
            min_share_use_hub_vip: 0,

            flood_rules,
        }
    }
}

impl Default for FloodRule {
    fn default() -> Self {
        Self {
            period_secs: 60,
            limit: 10,
            action: FloodAction::Skip,
        }
    }
}
