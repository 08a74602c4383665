//! Admission checks run when MyINFO arrives (spec.md §4.5).

use crate::config::Config;
use crate::state::class::Class;
use crate::state::user::NetMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    ShareTooSmall,
    ShareTooLarge,
    TooFewHubs,
    TooManyHubs,
    BadHubSlotRatio,
    ModeNotAllowed,
    ClientVersionRejected,
    HubUseDenied,
}

pub struct MyInfoAdmission<'a> {
    pub class: Class,
    pub share: u64,
    pub mode: Option<NetMode>,
    pub hubs_reg: u32,
    pub hubs_op: u32,
    pub hubs_unreg: u32,
    pub slots: u32,
    pub client_version: Option<&'a str>,
}

/// Checks share-size bounds (with the passive multiplier), then tag rules
/// (hub counts, hub/slot ratio, mode allow-list, client version bounds),
/// then hub-use admission thresholds. Returns the first violation found.
pub fn check(info: &MyInfoAdmission, config: &Config) -> Result<(), AdmissionError> {
    let effective_min = if info.mode == Some(NetMode::Passive) {
        (config.limits.min_share_size as f32 * config.limits.passive_share_multiplier) as u64
    } else {
        config.limits.min_share_size
    };
    if info.share < effective_min {
        return Err(AdmissionError::ShareTooSmall);
    }
    if info.share > config.limits.max_share_size {
        return Err(AdmissionError::ShareTooLarge);
    }

    if config.tag.show_tags {
        let total_hubs = info.hubs_reg + info.hubs_op + info.hubs_unreg;
        if total_hubs < config.tag.min_hubs {
            return Err(AdmissionError::TooFewHubs);
        }
        if total_hubs > config.tag.max_hubs {
            return Err(AdmissionError::TooManyHubs);
        }
        if config.tag.hub_slot_ratio > 0.0 && info.slots > 0 {
            let ratio = total_hubs as f32 / info.slots as f32;
            if ratio > config.tag.hub_slot_ratio {
                return Err(AdmissionError::BadHubSlotRatio);
            }
        }
        match info.mode {
            None if !config.tag.allow_none => return Err(AdmissionError::ModeNotAllowed),
            Some(NetMode::Passive) if !config.tag.allow_passive => return Err(AdmissionError::ModeNotAllowed),
            Some(NetMode::Sock5) if !config.tag.allow_sock5 => return Err(AdmissionError::ModeNotAllowed),
            _ => {}
        }
        if let Some(version) = info.client_version {
            if let Some(ref min) = config.tag.min_client_version {
                if version_less_than(version, min) {
                    return Err(AdmissionError::ClientVersionRejected);
                }
            }
            if let Some(ref max) = config.tag.max_client_version {
                if version_less_than(max, version) {
                    return Err(AdmissionError::ClientVersionRejected);
                }
            }
        }
    }

    let min_class_for_hub = if info.mode == Some(NetMode::Passive) {
        config.limits.min_class_use_hub_passive
    } else {
        config.limits.min_class_use_hub
    };
    if info.class.as_u8() < min_class_for_hub {
        return Err(AdmissionError::HubUseDenied);
    }
    let min_share_for_class = match info.class {
        Class::VipUser => config.limits.min_share_use_hub_vip,
        Class::RegUser => config.limits.min_share_use_hub_reg,
        _ => config.limits.min_share_use_hub,
    };
    if info.share < min_share_for_class {
        return Err(AdmissionError::HubUseDenied);
    }

    Ok(())
}

/// Compares dotted version strings numerically component-by-component.
fn version_less_than(a: &str, b: &str) -> bool {
    let pa = a.split('.').filter_map(|p| p.parse::<u32>().ok());
    let pb = b.split('.').filter_map(|p| p.parse::<u32>().ok());
    pa.zip(pb).find(|(x, y)| x != y).is_some_and(|(x, y)| x < y)
}
