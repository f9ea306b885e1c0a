//! Port edits.
//!
//! A definition's own ports are the only mutable port lists in the engine.
//! One [`PortEdit`] describes a change to the input or the output list; the
//! same value is replayed on the definition, on its Source or Sink, on every
//! compound instance of it, and on the saved buses of those instances.

use super::Definition;
use crate::error::{GateError, GateResult};
use crate::gate::{self, GateData, GateDim, GateKind, GateUid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PortEdit {
    Insert { index: usize, dim: GateDim, label: String },
    Remove { index: usize },
    Swap { a: usize, b: usize },
    Rename { index: usize, label: String },
}

impl PortEdit {
    /// Check the edit against a port list of `count` entries.
    pub(crate) fn validate(&self, definition: &str, count: usize) -> GateResult<()> {
        let out_of_range = |index: usize| GateError::InvalidPortIndex {
            definition: definition.to_owned(),
            index,
            count,
        };
        match *self {
            PortEdit::Insert { index, dim, .. } => {
                if dim == 0 {
                    return Err(GateError::InvalidDimension);
                }
                if index > count {
                    return Err(out_of_range(index));
                }
            }
            PortEdit::Remove { index } | PortEdit::Rename { index, .. } => {
                if index >= count {
                    return Err(out_of_range(index));
                }
            }
            PortEdit::Swap { a, b } => {
                if a >= count {
                    return Err(out_of_range(a));
                }
                if b >= count {
                    return Err(out_of_range(b));
                }
            }
        }
        Ok(())
    }

    /// Where a wire attached at `slot` ends up, or `None` if it is cut.
    pub(crate) fn remap(&self, slot: usize) -> Option<usize> {
        match *self {
            PortEdit::Insert { index, .. } if slot >= index => Some(slot + 1),
            PortEdit::Remove { index } if slot == index => None,
            PortEdit::Remove { index } if slot > index => Some(slot - 1),
            PortEdit::Swap { a, b } if slot == a => Some(b),
            PortEdit::Swap { a, b } if slot == b => Some(a),
            _ => Some(slot),
        }
    }

    /// Whether the edit moves or cuts any wire.
    fn rewires(&self) -> bool {
        !matches!(self, PortEdit::Rename { .. })
    }

    /// Apply the edit to a port list.
    pub(crate) fn apply(&self, dims: &mut Vec<GateDim>, labels: &mut Vec<String>) {
        if labels.len() != dims.len() {
            labels.resize(dims.len(), String::new());
        }
        match self {
            PortEdit::Insert { index, dim, label } => {
                dims.insert(*index, *dim);
                labels.insert(*index, label.clone());
            }
            PortEdit::Remove { index } => {
                dims.remove(*index);
                labels.remove(*index);
            }
            PortEdit::Swap { a, b } => {
                dims.swap(*a, *b);
                labels.swap(*a, *b);
            }
            PortEdit::Rename { index, label } => {
                labels[*index] = label.clone();
            }
        }
    }

    /// Apply the edit to saved bus values, one bus per port.
    pub(crate) fn apply_data(&self, data: &mut GateData) {
        match *self {
            PortEdit::Insert { index, dim, .. } if index <= data.len() => {
                data.insert(index, gate::zeros(&[dim]).remove(0));
            }
            PortEdit::Remove { index } if index < data.len() => {
                data.remove(index);
            }
            PortEdit::Swap { a, b } if a < data.len() && b < data.len() => data.swap(a, b),
            _ => {}
        }
    }
}

/// Which port list an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Inputs,
    Outputs,
}

impl Definition {
    /// Apply an edit to this definition's own inputs or outputs, its Source
    /// or Sink, and its live values. Returns `true` if a pair of gates lost
    /// its last wire.
    pub(crate) fn edit_ports(&mut self, side: Side, edit: &PortEdit) -> GateResult<bool> {
        let count = match side {
            Side::Inputs => self.input_dims.len(),
            Side::Outputs => self.output_dims.len(),
        };
        edit.validate(&self.name, count)?;

        match side {
            Side::Inputs => {
                edit.apply(&mut self.input_dims, &mut self.input_labels);
                edit.apply_data(&mut self.state.inputs);
                if let Some(GateKind::Source(source)) = self.gates.get_mut(&self.source).map(|g| g.kind_mut()) {
                    *source.dims_mut() = self.input_dims.clone();
                }
            }
            Side::Outputs => {
                edit.apply(&mut self.output_dims, &mut self.output_labels);
                edit.apply_data(&mut self.state.outputs);
                if let Some(GateKind::Sink(sink)) = self.gates.get_mut(&self.sink).map(|g| g.kind_mut()) {
                    *sink.dims_mut() = self.output_dims.clone();
                }
            }
        }

        if !edit.rewires() {
            return Ok(false);
        }
        Ok(match side {
            Side::Inputs => self.remap_outgoing(self.source, edit),
            Side::Outputs => self.remap_incoming(self.sink, edit),
        })
    }

    /// Apply an edit made to another definition to one of its compound
    /// instances held here. Returns `true` if a pair of gates lost its last
    /// wire.
    pub(crate) fn edit_instance_ports(&mut self, uid: GateUid, side: Side, edit: &PortEdit) -> bool {
        let Some(GateKind::Compound(gate)) = self.gates.get_mut(&uid).map(|g| g.kind_mut()) else {
            return false;
        };
        let (dims, labels) = match side {
            Side::Inputs => gate.inputs_mut(),
            Side::Outputs => gate.outputs_mut(),
        };
        edit.apply(dims, labels);

        if !edit.rewires() {
            return false;
        }
        match side {
            Side::Inputs => self.remap_incoming(uid, edit),
            Side::Outputs => self.remap_outgoing(uid, edit),
        }
    }

    /// Move the input slot of every wire into `uid`.
    fn remap_incoming(&mut self, uid: GateUid, edit: &PortEdit) -> bool {
        let predecessors: Vec<GateUid> = self.graph.predecessors(&uid).iter().copied().collect();
        let mut changed = false;
        for from in predecessors {
            changed |= self.remap_pair(from, uid, |(output, input)| {
                edit.remap(input).map(|input| (output, input))
            });
        }
        changed
    }

    /// Move the output slot of every wire out of `uid`.
    fn remap_outgoing(&mut self, uid: GateUid, edit: &PortEdit) -> bool {
        let successors: Vec<GateUid> = self.graph.successors(&uid).iter().copied().collect();
        let mut changed = false;
        for to in successors {
            changed |= self.remap_pair(uid, to, |(output, input)| {
                edit.remap(output).map(|output| (output, input))
            });
        }
        changed
    }

    /// Rewrite the wires between one pair. Returns `true` if none are left.
    fn remap_pair(
        &mut self,
        from: GateUid,
        to: GateUid,
        remap: impl Fn(super::Wire) -> Option<super::Wire>,
    ) -> bool {
        let wires = self.connections.get(from, to).unwrap_or_default();
        let mapped: Vec<_> = wires.iter().filter_map(|&wire| remap(wire)).collect();
        if mapped.as_slice() == wires.as_slice() {
            return false;
        }

        self.connections.remove(from, to);
        for wire in &mapped {
            self.connections.add(from, to, *wire);
        }
        if mapped.is_empty() {
            self.graph.remove_edge(&from, &to);
            self.mark_dirty();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_shifts_and_cuts() {
        let insert = PortEdit::Insert { index: 1, dim: 1, label: String::new() };
        assert_eq!(insert.remap(0), Some(0));
        assert_eq!(insert.remap(1), Some(2));

        let remove = PortEdit::Remove { index: 1 };
        assert_eq!(remove.remap(0), Some(0));
        assert_eq!(remove.remap(1), None);
        assert_eq!(remove.remap(2), Some(1));

        let swap = PortEdit::Swap { a: 0, b: 2 };
        assert_eq!(swap.remap(0), Some(2));
        assert_eq!(swap.remap(1), Some(1));
        assert_eq!(swap.remap(2), Some(0));
    }

    #[test]
    fn apply_keeps_labels_aligned() {
        let mut dims = vec![1, 2];
        let mut labels = vec!["a".to_owned(), "b".to_owned()];

        PortEdit::Insert { index: 0, dim: 3, label: "c".into() }.apply(&mut dims, &mut labels);
        assert_eq!(dims, vec![3, 1, 2]);
        assert_eq!(labels, vec!["c", "a", "b"]);

        PortEdit::Swap { a: 0, b: 2 }.apply(&mut dims, &mut labels);
        PortEdit::Remove { index: 1 }.apply(&mut dims, &mut labels);
        PortEdit::Rename { index: 0, label: "z".into() }.apply(&mut dims, &mut labels);
        assert_eq!(dims, vec![2, 3]);
        assert_eq!(labels, vec!["z", "c"]);
    }

    #[test]
    fn validate_rejects_bad_edits() {
        assert!(PortEdit::Insert { index: 2, dim: 1, label: String::new() }.validate("D", 2).is_ok());
        assert_eq!(
            PortEdit::Insert { index: 0, dim: 0, label: String::new() }.validate("D", 2),
            Err(GateError::InvalidDimension)
        );
        assert_eq!(
            PortEdit::Remove { index: 2 }.validate("D", 2),
            Err(GateError::InvalidPortIndex { definition: "D".into(), index: 2, count: 2 })
        );
    }

    #[test]
    fn apply_data_inserts_zeroed_buses() {
        let mut data = vec![Some(vec![Some(1)])];
        PortEdit::Insert { index: 0, dim: 2, label: String::new() }.apply_data(&mut data);
        assert_eq!(data, vec![Some(vec![Some(0), Some(0)]), Some(vec![Some(1)])]);
        PortEdit::Remove { index: 1 }.apply_data(&mut data);
        assert_eq!(data, vec![Some(vec![Some(0), Some(0)])]);
    }
}
