//! Propagating edits to nesting definitions.
//!
//! Every helper here starts from an edited definition `X` and walks the type
//! graph backwards. A definition `D` containing `X` directly is visited with
//! the chain `[X]`; a definition `E` containing `D` is visited with
//! `[X, D]`, and so on, once per path. The chain tells the state walk which
//! instances to descend through.

use indexmap::IndexSet;
use tracing::debug;

use super::Project;
use crate::definition::{PortEdit, Side};
use crate::gate::{self, GateState, GateUid, StateEntry};

impl Project {
    /// Every definition nesting `name`, paired with the chain of definition
    /// names leading from `name` to it.
    pub(crate) fn dependee_chains(&self, name: &str) -> Vec<(String, Vec<String>)> {
        let mut chains = Vec::new();
        self.collect_dependees(name, &mut Vec::new(), &mut chains);
        chains
    }

    fn collect_dependees(
        &self,
        name: &str,
        acc: &mut Vec<String>,
        chains: &mut Vec<(String, Vec<String>)>,
    ) {
        let key = name.to_owned();
        if !self.dependencies.contains_vertex(&key) {
            return;
        }
        acc.push(key.clone());
        for dependee in self.dependencies.predecessors(&key) {
            chains.push((dependee.clone(), acc.clone()));
            self.collect_dependees(dependee, acc, chains);
        }
        acc.pop();
    }

    /// Instance sets for each definition in a chain.
    fn instance_chain(&self, chain: &[String]) -> Vec<IndexSet<GateUid>> {
        chain
            .iter()
            .map(|name| {
                self.definitions
                    .get(name)
                    .map(|definition| definition.instances().clone())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Run `proc` on the saved entry of every instance of `name`, at every
    /// nesting depth, in every dependent definition.
    fn run_on_instance_states(&mut self, name: &str, proc: &mut dyn FnMut(&mut StateEntry)) {
        for (dependee, chain) in self.dependee_chains(name) {
            let instances = self.instance_chain(&chain);
            if let Some(definition) = self.definitions.get_mut(&dependee) {
                definition.run_on_type_states(&instances, proc);
            }
        }
    }

    /// Rebuild the saved state of every instance of `name` from scratch.
    ///
    /// The fresh state is what a new instance would start with: the nested
    /// initial state after one pull-mode step on default inputs. Saved
    /// outputs are only replaced where some were kept before.
    pub(crate) fn repair_instances(&mut self, name: &str) {
        let Some(definition) = self.definitions.get(name) else {
            return;
        };
        let mut state = definition.init_state(self).unwrap_or_default();
        let outputs =
            definition.process_state(self, &gate::zeros(definition.input_dims()), &mut state, false);
        let fresh = StateEntry::new(Some(GateState::Map(state)), Some(outputs));

        debug!(definition = name, "repairing nested instances");
        self.run_on_instance_states(name, &mut |entry| {
            entry.state.clone_from(&fresh.state);
            if entry.outputs.is_some() {
                entry.outputs.clone_from(&fresh.outputs);
            }
        });
    }

    /// Drop the saved entry of a removed gate from every instance of `name`.
    pub(crate) fn remove_uid(&mut self, name: &str, uid: GateUid) {
        self.run_on_instance_states(name, &mut |entry| {
            if let Some(GateState::Map(states)) = &mut entry.state {
                states.shift_remove(&uid);
            }
        });
    }

    /// Replay a port edit on `name` in every definition nesting it.
    ///
    /// Direct dependents update the compound gates and the wires attached to
    /// them. Output edits also reshape the saved outputs of instances at
    /// every depth.
    ///
    /// # Notes
    ///
    /// Removing a port can cut the last wire between a dependent's instance
    /// and one of its neighbours. That dependent's own instances further up
    /// are not repaired for it: their saved entries stay as they were, and
    /// any entry left without a feeding wire reads as unknown on the next
    /// step.
    pub(crate) fn propagate_port_edit(&mut self, name: &str, side: Side, edit: &PortEdit) {
        let key = name.to_owned();
        let dependees: Vec<String> = if self.dependencies.contains_vertex(&key) {
            self.dependencies.predecessors(&key).iter().cloned().collect()
        } else {
            Vec::new()
        };

        for dependee in &dependees {
            let Some(definition) = self.definitions.get_mut(dependee) else {
                continue;
            };
            let uids: Vec<GateUid> = definition
                .gate_types()
                .get(name)
                .map(|uids| uids.iter().copied().collect())
                .unwrap_or_default();
            for uid in uids {
                definition.edit_instance_ports(uid, side, edit);
            }
        }

        if side == Side::Outputs {
            self.run_on_instance_states(name, &mut |entry| {
                if let Some(outputs) = &mut entry.outputs {
                    edit.apply_data(outputs);
                }
            });
        }
        debug!(definition = name, ?side, dependees = dependees.len(), "propagated port edit");
    }
}
