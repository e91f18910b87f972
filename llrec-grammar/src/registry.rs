use std::collections::BTreeMap;

use crate::grammar::{NodeId, RuleId, MAX_RULES};

#[derive(Debug, PartialEq)]
pub enum RegistryError {
    TooManyRules,
    Redefined,
    MultipleStart,
}

// Name interning with forward references: a rule gets its dense id on first
// mention, the body arrives whenever its defining production is parsed.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    ids: BTreeMap<String, RuleId>,
    names: Vec<String>,
    bodies: Vec<Option<NodeId>>,
    undefined: usize,
    start: Option<RuleId>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistry::default()
    }

    pub fn lookup(&mut self, name: &str, body: Option<NodeId>) -> Result<RuleId, RegistryError> {
        if let Some(&id) = self.ids.get(name) {
            match (&self.bodies[id], body) {
                (Some(_), Some(_)) => Err(RegistryError::Redefined),
                (None, Some(new_body)) => {
                    self.bodies[id] = Some(new_body);
                    self.undefined -= 1;
                    Ok(id)
                }
                _ => Ok(id),
            }
        } else {
            if self.names.len() >= MAX_RULES {
                return Err(RegistryError::TooManyRules);
            }
            let id = self.names.len();
            self.ids.insert(name.to_string(), id);
            self.names.push(name.to_string());
            if body.is_none() {
                self.undefined += 1;
            }
            self.bodies.push(body);
            Ok(id)
        }
    }

    pub fn set_start(&mut self, id: RuleId) -> Result<(), RegistryError> {
        if self.start.is_some() {
            return Err(RegistryError::MultipleStart);
        }
        self.start = Some(id);
        Ok(())
    }

    pub fn start(&self) -> Option<RuleId> {
        self.start
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: RuleId) -> &str {
        &self.names[id]
    }

    pub fn body(&self, id: RuleId) -> Option<NodeId> {
        self.bodies[id]
    }

    pub fn undefined_names(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.bodies)
            .filter(|(_, body)| body.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
