//! Boolean condition trees used by branches, choice filters and loop guards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    /// True when no child is true.
    None,
    /// True when at least one child is true.
    Any,
    /// True when there is at least one child and every child is true.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOperator {
    pub fn compare(self, value: i32, test: i32) -> bool {
        match self {
            CompareOperator::Eq => value == test,
            CompareOperator::Ne => value != test,
            CompareOperator::Lt => value < test,
            CompareOperator::Le => value <= test,
            CompareOperator::Gt => value > test,
            CompareOperator::Ge => value >= test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    Fired,
    NotFired,
    EverFired,
    NeverFired,
}

/// Snapshot of a named trigger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub fired: bool,
    pub has_fired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    Logic {
        operator: LogicOperator,
        #[serde(default)]
        conditions: Vec<ConditionNode>,
    },
    HasActor {
        actor: String,
        #[serde(default)]
        negate: bool,
    },
    ActorInConversation {
        actor: String,
        #[serde(default)]
        negate: bool,
    },
    Variable {
        variable: String,
        operator: CompareOperator,
        #[serde(default)]
        value: i32,
        #[serde(default)]
        value_variable: Option<String>,
    },
    ActorParameter {
        actor: String,
        parameter: String,
        operator: CompareOperator,
        #[serde(default)]
        value: i32,
        #[serde(default)]
        value_variable: Option<String>,
    },
    ActorCommand {
        actor: String,
        command: String,
        #[serde(default)]
        negate: bool,
    },
    GameCommand {
        command: String,
        #[serde(default)]
        negate: bool,
    },
    Trigger {
        name: String,
        mode: TriggerMode,
    },
}

/// World state queried while evaluating conditions.
///
/// Lookups return `None` for anything unknown; the evaluator maps those to
/// `false`/`0` so evaluation never fails.
pub trait ConditionSource {
    /// Actor lookup by id or alias.
    fn has_actor(&self, id: &str) -> bool;

    fn actor_in_conversation(&self, id: &str) -> bool {
        self.has_actor(id)
    }

    fn variable(&self, name: &str) -> Option<i32>;

    fn actor_parameter(&self, actor: &str, name: &str) -> Option<i32>;

    fn actor_command(&self, actor: &str, command: &str) -> Option<bool>;

    fn game_command(&self, command: &str) -> Option<bool>;

    fn trigger(&self, name: &str) -> Option<TriggerState>;
}

/// Evaluates `condition` against `source`. Pure: the same tree against the
/// same state always yields the same answer.
pub fn evaluate<S>(condition: &ConditionNode, source: &S) -> bool
where
    S: ConditionSource + ?Sized,
{
    match condition {
        ConditionNode::Logic {
            operator,
            conditions,
        } => match operator {
            LogicOperator::None => !conditions.iter().any(|child| evaluate(child, source)),
            LogicOperator::Any => conditions.iter().any(|child| evaluate(child, source)),
            LogicOperator::All => {
                !conditions.is_empty() && conditions.iter().all(|child| evaluate(child, source))
            }
        },
        ConditionNode::HasActor { actor, negate } => source.has_actor(actor) != *negate,
        ConditionNode::ActorInConversation { actor, negate } => {
            source.actor_in_conversation(actor) != *negate
        }
        ConditionNode::Variable {
            variable,
            operator,
            value,
            value_variable,
        } => {
            let current = source.variable(variable).unwrap_or(0);
            operator.compare(current, test_value(source, *value, value_variable.as_deref()))
        }
        ConditionNode::ActorParameter {
            actor,
            parameter,
            operator,
            value,
            value_variable,
        } => {
            let current = source.actor_parameter(actor, parameter).unwrap_or(0);
            operator.compare(current, test_value(source, *value, value_variable.as_deref()))
        }
        ConditionNode::ActorCommand {
            actor,
            command,
            negate,
        } => match source.actor_command(actor, command) {
            Some(state) => state != *negate,
            None => *negate,
        },
        ConditionNode::GameCommand { command, negate } => match source.game_command(command) {
            Some(state) => state != *negate,
            None => *negate,
        },
        ConditionNode::Trigger { name, mode } => {
            let state = source.trigger(name);
            let fired = state.map(|trigger| trigger.fired).unwrap_or(false);
            let has_fired = state.map(|trigger| trigger.has_fired).unwrap_or(false);
            match mode {
                TriggerMode::Fired => fired,
                TriggerMode::NotFired => !fired,
                TriggerMode::EverFired => has_fired,
                TriggerMode::NeverFired => !has_fired,
            }
        }
    }
}

fn test_value<S>(source: &S, literal: i32, variable: Option<&str>) -> i32
where
    S: ConditionSource + ?Sized,
{
    match variable.filter(|name| !name.is_empty()) {
        Some(name) => source.variable(name).unwrap_or(0),
        None => literal,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Default)]
    struct MapSource {
        actors: Vec<&'static str>,
        variables: BTreeMap<&'static str, i32>,
        parameters: BTreeMap<(&'static str, &'static str), i32>,
        actor_commands: BTreeMap<(&'static str, &'static str), bool>,
        game_commands: BTreeMap<&'static str, bool>,
        triggers: BTreeMap<&'static str, TriggerState>,
    }

    impl ConditionSource for MapSource {
        fn has_actor(&self, id: &str) -> bool {
            self.actors.iter().any(|actor| *actor == id)
        }

        fn variable(&self, name: &str) -> Option<i32> {
            self.variables.get(name).copied()
        }

        fn actor_parameter(&self, actor: &str, name: &str) -> Option<i32> {
            self.parameters
                .iter()
                .find_map(|((a, n), value)| (*a == actor && *n == name).then_some(*value))
        }

        fn actor_command(&self, actor: &str, command: &str) -> Option<bool> {
            self.actor_commands
                .iter()
                .find_map(|((a, c), value)| (*a == actor && *c == command).then_some(*value))
        }

        fn game_command(&self, command: &str) -> Option<bool> {
            self.game_commands.get(command).copied()
        }

        fn trigger(&self, name: &str) -> Option<TriggerState> {
            self.triggers.get(name).copied()
        }
    }

    fn logic(operator: LogicOperator, conditions: Vec<ConditionNode>) -> ConditionNode {
        ConditionNode::Logic {
            operator,
            conditions,
        }
    }

    fn has_actor(actor: &str) -> ConditionNode {
        ConditionNode::HasActor {
            actor: actor.to_string(),
            negate: false,
        }
    }

    #[test]
    fn empty_logic_nodes() {
        let source = MapSource::default();
        assert!(!evaluate(&logic(LogicOperator::All, Vec::new()), &source));
        assert!(!evaluate(&logic(LogicOperator::Any, Vec::new()), &source));
        assert!(evaluate(&logic(LogicOperator::None, Vec::new()), &source));
    }

    #[test]
    fn logic_combines_children() {
        let source = MapSource {
            actors: vec!["glottis"],
            ..MapSource::default()
        };
        let present = has_actor("glottis");
        let missing = has_actor("domino");

        let any = logic(LogicOperator::Any, vec![missing.clone(), present.clone()]);
        let all = logic(LogicOperator::All, vec![missing.clone(), present.clone()]);
        let none = logic(LogicOperator::None, vec![missing.clone()]);
        assert!(evaluate(&any, &source));
        assert!(!evaluate(&all, &source));
        assert!(evaluate(&none, &source));
        assert!(evaluate(
            &logic(LogicOperator::All, vec![present.clone(), present]),
            &source
        ));
    }

    #[test]
    fn actor_presence_respects_negate() {
        let source = MapSource {
            actors: vec!["manny"],
            ..MapSource::default()
        };
        let negated = ConditionNode::ActorInConversation {
            actor: "manny".to_string(),
            negate: true,
        };
        assert!(evaluate(&has_actor("manny"), &source));
        assert!(!evaluate(&negated, &source));
        assert!(!evaluate(&has_actor("eva"), &source));
    }

    #[test]
    fn variables_compare_against_literal_or_variable() {
        let mut source = MapSource::default();
        source.variables.insert("coins", 5);
        source.variables.insert("price", 7);

        let literal = ConditionNode::Variable {
            variable: "coins".to_string(),
            operator: CompareOperator::Ge,
            value: 5,
            value_variable: None,
        };
        let against_price = ConditionNode::Variable {
            variable: "coins".to_string(),
            operator: CompareOperator::Lt,
            value: 0,
            value_variable: Some("price".to_string()),
        };
        let missing_defaults_to_zero = ConditionNode::Variable {
            variable: "unknown".to_string(),
            operator: CompareOperator::Eq,
            value: 99,
            value_variable: Some("also_unknown".to_string()),
        };
        assert!(evaluate(&literal, &source));
        assert!(evaluate(&against_price, &source));
        assert!(evaluate(&missing_defaults_to_zero, &source));
    }

    #[test]
    fn actor_parameters_default_to_zero() {
        let mut source = MapSource::default();
        source.parameters.insert(("manny", "mood"), 3);

        let known = ConditionNode::ActorParameter {
            actor: "manny".to_string(),
            parameter: "mood".to_string(),
            operator: CompareOperator::Gt,
            value: 2,
            value_variable: None,
        };
        let unknown = ConditionNode::ActorParameter {
            actor: "eva".to_string(),
            parameter: "mood".to_string(),
            operator: CompareOperator::Eq,
            value: 0,
            value_variable: None,
        };
        assert!(evaluate(&known, &source));
        assert!(evaluate(&unknown, &source));
    }

    #[test]
    fn commands_fall_back_to_negate_when_missing() {
        let mut source = MapSource::default();
        source.actor_commands.insert(("manny", "sit"), true);
        source.game_commands.insert("doors_locked", false);

        let sit = ConditionNode::ActorCommand {
            actor: "manny".to_string(),
            command: "sit".to_string(),
            negate: false,
        };
        let missing = ConditionNode::ActorCommand {
            actor: "manny".to_string(),
            command: "dance".to_string(),
            negate: true,
        };
        let locked = ConditionNode::GameCommand {
            command: "doors_locked".to_string(),
            negate: true,
        };
        let unknown_game = ConditionNode::GameCommand {
            command: "unknown".to_string(),
            negate: false,
        };
        assert!(evaluate(&sit, &source));
        assert!(evaluate(&missing, &source));
        assert!(evaluate(&locked, &source));
        assert!(!evaluate(&unknown_game, &source));
    }

    #[test]
    fn trigger_modes() {
        let mut source = MapSource::default();
        source.triggers.insert(
            "alarm",
            TriggerState {
                fired: false,
                has_fired: true,
            },
        );
        let check = |name: &str, mode| {
            evaluate(
                &ConditionNode::Trigger {
                    name: name.to_string(),
                    mode,
                },
                &source,
            )
        };
        assert!(!check("alarm", TriggerMode::Fired));
        assert!(check("alarm", TriggerMode::NotFired));
        assert!(check("alarm", TriggerMode::EverFired));
        assert!(!check("alarm", TriggerMode::NeverFired));
        assert!(!check("missing", TriggerMode::Fired));
        assert!(check("missing", TriggerMode::NotFired));
        assert!(!check("missing", TriggerMode::EverFired));
        assert!(check("missing", TriggerMode::NeverFired));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let mut source = MapSource::default();
        source.variables.insert("count", 2);
        let condition = logic(
            LogicOperator::Any,
            vec![
                has_actor("nobody"),
                ConditionNode::Variable {
                    variable: "count".to_string(),
                    operator: CompareOperator::Eq,
                    value: 2,
                    value_variable: None,
                },
            ],
        );
        let first = evaluate(&condition, &source);
        for _ in 0..4 {
            assert_eq!(evaluate(&condition, &source), first);
        }
    }

    #[test]
    fn conditions_deserialize_from_tagged_json() {
        let json = r#"{
            "type": "logic",
            "operator": "all",
            "conditions": [
                { "type": "has_actor", "actor": "manny" },
                { "type": "trigger", "name": "alarm", "mode": "never_fired" }
            ]
        }"#;
        let condition: ConditionNode = serde_json::from_str(json).expect("valid condition");
        let source = MapSource {
            actors: vec!["manny"],
            ..MapSource::default()
        };
        assert!(evaluate(&condition, &source));
    }
}
