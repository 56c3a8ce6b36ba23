//! Mutation primitives. Every edit of the edge lists goes through here so
//! that `a` is among `b.inputs` exactly as many times as `b` is among
//! `a.outputs`.
use tessel_core::internal::*;

use super::TfGraph;
use crate::errors::ImportError;

fn replace_first(list: &mut [usize], old: usize, new: usize) -> bool {
    if let Some(slot) = list.iter_mut().find(|it| **it == old) {
        *slot = new;
        true
    } else {
        false
    }
}

fn remove_first(list: &mut Vec<usize>, it: usize) -> bool {
    if let Some(pos) = list.iter().position(|&x| x == it) {
        list.remove(pos);
        true
    } else {
        false
    }
}

impl TfGraph<'_> {
    pub fn add_edge(&mut self, from: usize, to: usize) -> TesselResult<()> {
        self.node(to)?;
        self.node_mut(from)?.outputs.push(to);
        self.node_mut(to)?.inputs.push(from);
        Ok(())
    }

    /// Adds an edge landing at position `slot` of `to.inputs`.
    pub fn insert_edge(&mut self, from: usize, to: usize, slot: usize) -> TesselResult<()> {
        self.node(from)?;
        let inputs = &mut self.node_mut(to)?.inputs;
        inputs.insert(slot.min(inputs.len()), from);
        self.nodes[from].outputs.push(to);
        Ok(())
    }

    /// Removes one `from -> to` edge.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> TesselResult<()> {
        let found = self.node(to)?.inputs.contains(&from) && self.node(from)?.outputs.contains(&to);
        if !found {
            let expected = format!("an input edge from {}", self.name(from));
            return Err(ImportError::pattern(self.name(to), expected).into());
        }
        remove_first(&mut self.nodes[from].outputs, to);
        remove_first(&mut self.nodes[to].inputs, from);
        Ok(())
    }

    /// Turns a node into an island. It stays in the sequence.
    pub fn disconnect(&mut self, id: usize) -> TesselResult<()> {
        let inputs = std::mem::take(&mut self.node_mut(id)?.inputs);
        for input in inputs {
            if !remove_first(&mut self.nodes[input].outputs, id) {
                bail!("Asymmetric edge {} -> {}", self.nodes[input], self.nodes[id]);
            }
        }
        let outputs = std::mem::take(&mut self.nodes[id].outputs);
        for output in outputs {
            if !remove_first(&mut self.nodes[output].inputs, id) {
                bail!("Asymmetric edge {} -> {}", self.nodes[id], self.nodes[output]);
            }
        }
        Ok(())
    }

    fn check_pair(&self, base: usize, other: usize, expected: &str) -> TesselResult<()> {
        self.node(base)?;
        self.node(other)?;
        if base == other {
            return Err(ImportError::pattern(self.name(base), "a node distinct from itself").into());
        }
        let linked = match expected {
            "parent" => self.nodes[base].inputs.contains(&other),
            _ => self.nodes[base].outputs.contains(&other),
        };
        if !linked {
            let expected = format!("{} as {expected}", self.name(other));
            return Err(ImportError::pattern(self.name(base), expected).into());
        }
        Ok(())
    }

    /// `base` takes over everything `parent` is connected to.
    ///
    /// The parent entry is dropped from `base.inputs` and the parent's own
    /// inputs are appended, in order. The parent's other consumers become
    /// consumers of `base`. The parent is left isolated, its definitions
    /// appended to the base's.
    pub fn merge_parent(&mut self, base: usize, parent: usize) -> TesselResult<()> {
        self.check_pair(base, parent, "parent")?;
        trace!("Merging parent {} into {}", self.nodes[parent], self.nodes[base]);
        self.nodes[base].inputs.retain(|&i| i != parent);
        self.nodes[parent].outputs.retain(|&o| o != base);

        let grand_parents = std::mem::take(&mut self.nodes[parent].inputs);
        for g in grand_parents {
            if g == base {
                remove_first(&mut self.nodes[base].outputs, parent);
                continue;
            }
            self.nodes[base].inputs.push(g);
            replace_first(&mut self.nodes[g].outputs, parent, base);
        }
        let children = std::mem::take(&mut self.nodes[parent].outputs);
        for c in children {
            self.nodes[base].outputs.push(c);
            replace_first(&mut self.nodes[c].inputs, parent, base);
        }
        let defs = self.nodes[parent].defs.clone();
        self.nodes[base].defs.extend(defs);
        Ok(())
    }

    /// Mirror of `merge_parent`: `base` absorbs one of its consumers.
    pub fn merge_child(&mut self, base: usize, child: usize) -> TesselResult<()> {
        self.check_pair(base, child, "child")?;
        trace!("Merging child {} into {}", self.nodes[child], self.nodes[base]);
        self.nodes[base].outputs.retain(|&o| o != child);
        self.nodes[child].inputs.retain(|&i| i != base);

        let children = std::mem::take(&mut self.nodes[child].outputs);
        for c in children {
            if c == base {
                remove_first(&mut self.nodes[base].inputs, child);
                continue;
            }
            self.nodes[base].outputs.push(c);
            replace_first(&mut self.nodes[c].inputs, child, base);
        }
        let other_parents = std::mem::take(&mut self.nodes[child].inputs);
        for p in other_parents {
            self.nodes[base].inputs.push(p);
            replace_first(&mut self.nodes[p].outputs, child, base);
        }
        let defs = self.nodes[child].defs.clone();
        self.nodes[base].defs.extend(defs);
        Ok(())
    }

    /// `merge_parent`, then moves the parent's inputs back to the slot the
    /// parent used to occupy in `base.inputs`.
    pub fn merge_parent_in_place(&mut self, base: usize, parent: usize) -> TesselResult<()> {
        self.check_pair(base, parent, "parent")?;
        let slot = self.nodes[base].inputs.iter().position(|&i| i == parent).unwrap_or_default();
        let moved = self.nodes[parent].inputs.iter().filter(|&&i| i != base).count();
        self.merge_parent(base, parent)?;
        let inputs = &mut self.nodes[base].inputs;
        let tail = inputs.split_off(inputs.len() - moved);
        inputs.splice(slot..slot, tail);
        Ok(())
    }
}
