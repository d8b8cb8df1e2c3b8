// Inbound command parsing: loosely typed JSON in, one validated `Command` out.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::scene::transform::PlacementParams;
use crate::source::locator::AssetLocator;

/// One `init` asset entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSpec {
    pub locator: AssetLocator,
    /// Placement defaults for later `place` commands naming this asset.
    pub defaults: PlacementParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCommand {
    pub asset: String,
    pub params: PlacementParams,
    pub play: bool,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init {
        assets: Vec<AssetSpec>,
        coaching_overlay: Option<bool>,
    },
    Place(PlaceCommand),
    Play {
        repeat: bool,
    },
}

/// Parse a raw message, logging and dropping it when malformed.
pub fn dispatch(raw: &str) -> Option<Command> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("dropping command that is not valid JSON: {}", e);
            return None;
        }
    };
    match parse_command(&value) {
        Ok(command) => {
            debug!("dispatching {:?}", command);
            Some(command)
        }
        Err(e) => {
            warn!("dropping command: {}", e);
            None
        }
    }
}

pub fn parse_command(value: &Value) -> Result<Command, CommandError> {
    let obj = value.as_object().ok_or(CommandError::NotAnObject)?;
    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .ok_or(CommandError::MissingAction)?;

    match action {
        "init" => parse_init(obj),
        "place" => parse_place(obj),
        "play" => Ok(Command::Play {
            repeat: flag(obj, "loop", "play")?,
        }),
        other => Err(CommandError::UnknownAction(other.to_string())),
    }
}

fn parse_init(obj: &Map<String, Value>) -> Result<Command, CommandError> {
    let assets = obj
        .get("assets")
        .and_then(Value::as_object)
        .ok_or_else(|| CommandError::MissingField {
            action: "init",
            field: "assets".into(),
        })?;

    let mut specs = Vec::with_capacity(assets.len());
    for (name, entry) in assets {
        let url = entry
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::MissingField {
                action: "init",
                field: format!("assets.{}.url", name),
            })?;
        let locator =
            AssetLocator::parse(name.as_str(), url).ok_or_else(|| CommandError::InvalidLocator {
                name: name.clone(),
                url: url.to_string(),
            })?;
        let defaults = params(entry, "init")?;
        specs.push(AssetSpec { locator, defaults });
    }

    let coaching_overlay = match obj.get("coachingOverlay") {
        None | Some(Value::Null) => None,
        Some(_) => Some(flag(obj, "coachingOverlay", "init")?),
    };

    Ok(Command::Init {
        assets: specs,
        coaching_overlay,
    })
}

fn parse_place(obj: &Map<String, Value>) -> Result<Command, CommandError> {
    let asset = obj
        .get("asset")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CommandError::MissingField {
            action: "place",
            field: "asset".into(),
        })?;

    Ok(Command::Place(PlaceCommand {
        asset: asset.to_string(),
        params: params(&Value::Object(obj.clone()), "place")?,
        play: flag(obj, "play", "place")?,
        repeat: flag(obj, "loop", "place")?,
    }))
}

fn params(value: &Value, action: &'static str) -> Result<PlacementParams, CommandError> {
    PlacementParams::deserialize(value).map_err(|e| CommandError::Payload {
        action,
        message: e.to_string(),
    })
}

/// Optional boolean field, `false` when absent.
fn flag(obj: &Map<String, Value>, key: &str, action: &'static str) -> Result<bool, CommandError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(CommandError::Payload {
            action,
            message: format!("`{}` must be a boolean, got {}", key, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scene::transform::Axes;

    #[test]
    fn test_parse_init() {
        let cmd = parse_command(&json!({
            "action": "init",
            "coachingOverlay": true,
            "assets": {
                "shoe": {"url": "https://cdn.test/shoe.usdz", "scale": 0.25}
            }
        }))
        .unwrap();

        let Command::Init {
            assets,
            coaching_overlay,
        } = cmd
        else {
            panic!("expected init");
        };
        assert_eq!(coaching_overlay, Some(true));
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].locator.name, "shoe");
        assert_eq!(assets[0].locator.url.as_str(), "https://cdn.test/shoe.usdz");
        assert_eq!(assets[0].defaults.scale, Some(0.25));
    }

    #[test]
    fn test_parse_place_with_optional_fields() {
        let cmd = parse_command(&json!({
            "action": "place",
            "asset": "shoe",
            "scale": 0.5,
            "rotation": {"y": 45},
            "play": true
        }))
        .unwrap();

        assert_eq!(
            cmd,
            Command::Place(PlaceCommand {
                asset: "shoe".into(),
                params: PlacementParams {
                    scale: Some(0.5),
                    rotation: Some(Axes { x: 0.0, y: 45.0, z: 0.0 }),
                    translation: None,
                },
                play: true,
                repeat: false,
            })
        );
    }

    #[test]
    fn test_parse_play() {
        assert_eq!(
            parse_command(&json!({"action": "play", "loop": true})),
            Ok(Command::Play { repeat: true })
        );
        assert_eq!(
            parse_command(&json!({"action": "play"})),
            Ok(Command::Play { repeat: false })
        );
    }

    #[test]
    fn test_malformed_commands_are_rejected() {
        assert_eq!(
            parse_command(&json!({"asset": "shoe"})),
            Err(CommandError::MissingAction)
        );
        assert_eq!(
            parse_command(&json!({"action": "dance"})),
            Err(CommandError::UnknownAction("dance".into()))
        );
        assert!(matches!(
            parse_command(&json!({"action": "place"})),
            Err(CommandError::MissingField { field, .. }) if field == "asset"
        ));
        assert!(matches!(
            parse_command(&json!({"action": "init", "assets": {"shoe": {}}})),
            Err(CommandError::MissingField { .. })
        ));
        assert!(matches!(
            parse_command(&json!({"action": "init", "assets": {"shoe": {"url": "nope"}}})),
            Err(CommandError::InvalidLocator { .. })
        ));
        assert!(matches!(
            parse_command(&json!({"action": "place", "asset": "shoe", "scale": "big"})),
            Err(CommandError::Payload { .. })
        ));
        assert_eq!(parse_command(&json!([1, 2])), Err(CommandError::NotAnObject));
    }

    #[test]
    fn test_dispatch_drops_invalid_json() {
        assert!(dispatch("{not json").is_none());
        assert!(dispatch(r#"{"action":"play"}"#).is_some());
    }
}
