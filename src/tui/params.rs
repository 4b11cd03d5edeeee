use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::model::ticket::Ticket;
use crate::tui::views::edit::EditField;

const TICKET_ID: &str = "ticketID";
const DRAFT_TICKET: &str = "draftTicket";
const FOCUS_FIELD: &str = "focusField";
const LOADED_MTIME: &str = "loadedMtime";
const PLUGIN_PREFIX: &str = "plugin:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("unknown view '{0}'")]
    UnknownView(String),
    #[error("missing parameter '{0}'")]
    Missing(&'static str),
    #[error("invalid parameter '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}

/// Which view a navigation frame shows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewId {
    TaskDetail,
    TaskEdit,
    Plugin(String),
}

impl ViewId {
    pub fn parse(s: &str) -> Result<ViewId, ParamsError> {
        match s {
            "task_detail" => Ok(ViewId::TaskDetail),
            "task_edit" => Ok(ViewId::TaskEdit),
            _ => match s.strip_prefix(PLUGIN_PREFIX) {
                Some(name) if !name.is_empty() => Ok(ViewId::Plugin(name.to_string())),
                _ => Err(ParamsError::UnknownView(s.to_string())),
            },
        }
    }

    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            ViewId::Plugin(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewId::TaskDetail => f.write_str("task_detail"),
            ViewId::TaskEdit => f.write_str("task_edit"),
            ViewId::Plugin(name) => write!(f, "{}{}", PLUGIN_PREFIX, name),
        }
    }
}

/// Typed parameters for each view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewParams {
    TaskDetail {
        ticket_id: String,
    },
    TaskEdit {
        /// Empty for a ticket that has not been saved yet
        ticket_id: String,
        draft: Option<Box<Ticket>>,
        focus: Option<EditField>,
    },
    Plugin,
}

impl ViewParams {
    /// Flatten into the untyped map carried by a navigation frame
    pub fn encode(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        match self {
            ViewParams::TaskDetail { ticket_id } => {
                map.insert(TICKET_ID.to_string(), ticket_id.clone());
            }
            ViewParams::TaskEdit {
                ticket_id,
                draft,
                focus,
            } => {
                map.insert(TICKET_ID.to_string(), ticket_id.clone());
                if let Some(draft) = draft {
                    // Ticket contains only plain data, so encoding cannot fail
                    if let Ok(json) = serde_json::to_string(draft) {
                        map.insert(DRAFT_TICKET.to_string(), json);
                    }
                    if let Some(nanos) = draft.loaded_mtime.and_then(mtime_to_nanos) {
                        map.insert(LOADED_MTIME.to_string(), nanos.to_string());
                    }
                }
                if let Some(field) = focus {
                    map.insert(FOCUS_FIELD.to_string(), field.as_str().to_string());
                }
            }
            ViewParams::Plugin => {}
        }
        map
    }

    /// Rebuild typed parameters for `view` from an untyped map
    pub fn decode(view: &ViewId, map: &BTreeMap<String, String>) -> Result<Self, ParamsError> {
        match view {
            ViewId::TaskDetail => {
                let ticket_id = map
                    .get(TICKET_ID)
                    .filter(|id| !id.is_empty())
                    .ok_or(ParamsError::Missing(TICKET_ID))?;
                Ok(ViewParams::TaskDetail {
                    ticket_id: ticket_id.clone(),
                })
            }
            ViewId::TaskEdit => {
                let ticket_id = map.get(TICKET_ID).cloned().unwrap_or_default();
                let draft = match map.get(DRAFT_TICKET) {
                    Some(json) => {
                        let mut ticket: Ticket =
                            serde_json::from_str(json).map_err(|e| ParamsError::Invalid {
                                key: DRAFT_TICKET,
                                message: e.to_string(),
                            })?;
                        ticket.loaded_mtime = match map.get(LOADED_MTIME) {
                            Some(raw) => Some(nanos_to_mtime(raw.parse().map_err(
                                |e: std::num::ParseIntError| ParamsError::Invalid {
                                    key: LOADED_MTIME,
                                    message: e.to_string(),
                                },
                            )?)),
                            None => None,
                        };
                        Some(Box::new(ticket))
                    }
                    None => None,
                };
                let focus = match map.get(FOCUS_FIELD) {
                    Some(raw) => Some(EditField::parse(raw).ok_or_else(|| {
                        ParamsError::Invalid {
                            key: FOCUS_FIELD,
                            message: format!("unknown field '{}'", raw),
                        }
                    })?),
                    None => None,
                };
                Ok(ViewParams::TaskEdit {
                    ticket_id,
                    draft,
                    focus,
                })
            }
            ViewId::Plugin(_) => Ok(ViewParams::Plugin),
        }
    }
}

fn mtime_to_nanos(t: SystemTime) -> Option<u128> {
    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_nanos())
}

fn nanos_to_mtime(nanos: u128) -> SystemTime {
    let secs = (nanos / 1_000_000_000) as u64;
    let sub = (nanos % 1_000_000_000) as u32;
    UNIX_EPOCH + Duration::new(secs, sub)
}

/// One entry of the navigation stack
#[derive(Debug, Clone, PartialEq)]
pub struct NavFrame {
    pub view: ViewId,
    pub params: ViewParams,
}

impl NavFrame {
    pub fn plugin(name: &str) -> Self {
        NavFrame {
            view: ViewId::Plugin(name.to_string()),
            params: ViewParams::Plugin,
        }
    }

    pub fn detail(ticket_id: &str) -> Self {
        NavFrame {
            view: ViewId::TaskDetail,
            params: ViewParams::TaskDetail {
                ticket_id: ticket_id.to_string(),
            },
        }
    }

    pub fn edit(ticket_id: &str, draft: Option<Ticket>, focus: Option<EditField>) -> Self {
        NavFrame {
            view: ViewId::TaskEdit,
            params: ViewParams::TaskEdit {
                ticket_id: ticket_id.to_string(),
                draft: draft.map(Box::new),
                focus,
            },
        }
    }

    /// View id string plus encoded parameters
    pub fn encode(&self) -> (String, BTreeMap<String, String>) {
        (self.view.to_string(), self.params.encode())
    }

    pub fn decode(view: &str, params: &BTreeMap<String, String>) -> Result<Self, ParamsError> {
        let view = ViewId::parse(view)?;
        let params = ViewParams::decode(&view, params)?;
        Ok(NavFrame { view, params })
    }
}
