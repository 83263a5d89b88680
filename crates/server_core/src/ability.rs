//! Casting: abilities expand into events (ordered action lists) that the
//! game queue processes on the next tick. Nothing executes inline here.

use data_runtime::abilities::{AbilitySpec, EffectSpec};

use crate::actions::{Action, ActionKind};

/// An ordered list of actions produced by one cast.
#[derive(Debug)]
pub struct Event {
    pub id: String,
    pub actions: Vec<Action>,
}

/// Cast-time arguments carried from the client envelope.
#[derive(Debug, Clone, Default)]
pub struct CastArgs {
    pub using: Option<String>,
    pub granted_by: Option<String>,
    pub target: Option<String>,
    pub params: Option<serde_json::Value>,
}

/// Expand an ability spec into an event for `caster`. Reference validity is
/// the caller's concern; this only shapes actions.
#[must_use]
pub fn expand(spec: &AbilitySpec, caster: &str, args: &CastArgs) -> Event {
    let resolved_target = if spec.self_target {
        args.target.clone().or_else(|| Some(caster.to_string()))
    } else {
        args.target.clone()
    };
    let mut actions = Vec::new();
    for effect in &spec.effects {
        let kind = match effect {
            EffectSpec::AdjustProperty { property, amount } => ActionKind::PropertyAdjustment {
                property: property.clone(),
                amount: *amount,
            },
            EffectSpec::Custom { name } => ActionKind::Custom {
                name: name.clone(),
                payload: args.params.clone().unwrap_or(serde_json::Value::Null),
            },
        };
        let mut action = Action::new(kind);
        action.caster = Some(caster.to_string());
        action.target = resolved_target.clone();
        action.using = args.using.clone();
        action.tags = spec.tags.clone();
        action.breadcrumbs.push(format!("cast:{}", spec.name));
        actions.push(action);
    }
    Event {
        id: crate::new_id(),
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heal_expands_to_self_targeted_adjustment() {
        let specs = data_runtime::abilities::builtin();
        let heal = specs.iter().find(|s| s.name == "Heal").expect("Heal");
        let ev = expand(heal, "paladin", &CastArgs::default());
        assert_eq!(ev.actions.len(), 1);
        let a = &ev.actions[0];
        assert_eq!(a.caster.as_deref(), Some("paladin"));
        assert_eq!(a.target.as_deref(), Some("paladin"));
        assert!(a.breadcrumbs.iter().any(|b| b == "cast:Heal"));
        match &a.kind {
            ActionKind::PropertyAdjustment { property, amount } => {
                assert_eq!(property, "HP");
                assert_eq!(*amount, 5.0);
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn explicit_target_overrides_self_target() {
        let specs = data_runtime::abilities::builtin();
        let heal = specs.iter().find(|s| s.name == "Heal").expect("Heal");
        let ev = expand(
            heal,
            "paladin",
            &CastArgs {
                target: Some("squire".into()),
                ..CastArgs::default()
            },
        );
        assert_eq!(ev.actions[0].target.as_deref(), Some("squire"));
    }
}
