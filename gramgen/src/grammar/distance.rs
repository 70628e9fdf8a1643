//! Distance-to-terminal computation.
//!
//! The grammar graph may be cyclic, so a single topological pass cannot
//! assign distances. Instead every node is relaxed repeatedly until a full
//! sweep changes nothing:
//!
//! ```text
//! terminal          d = 0
//! Or, Choice        d = min(d, 1 + min(children))
//! everything else   d = min(d, 1 + sum(children))   (UNREACHABLE if any child is)
//! ```
//!
//! Distances only decrease, and a minimal derivation never repeats a node on
//! a root-to-leaf path, so the fixed point is reached within `V` productive
//! sweeps plus one confirming sweep.

use tracing::debug;

use super::{Grammar, GrammarType, NodeId, UNREACHABLE};

impl Grammar {
    /// Computes `distance` for every node. Returns the number of sweeps run.
    ///
    /// Distances are recomputed from scratch, so running this again on a
    /// converged grammar leaves every node unchanged.
    pub fn build_shortest_notation(&mut self) -> usize {
        let ids: Vec<NodeId> = self.graph().vertices().map(|(id, _)| id).collect();
        let slots = ids.iter().map(|id| id.index() + 1).max().unwrap_or(0);

        let mut kinds = vec![GrammarType::Terminal; slots];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots];
        let mut distance = vec![UNREACHABLE; slots];
        for &id in &ids {
            if let Some(node) = self.node(id) {
                kinds[id.index()] = node.kind();
                children[id.index()] = node.symbols().iter().map(|c| c.index()).collect();
                if node.kind() == GrammarType::Terminal {
                    distance[id.index()] = 0;
                }
            }
        }

        let mut sweeps = 0;
        loop {
            sweeps += 1;
            let mut changed = false;
            for id in &ids {
                let i = id.index();
                let candidate = match kinds[i] {
                    GrammarType::Terminal => continue,
                    GrammarType::Or | GrammarType::Choice => {
                        let best = children[i]
                            .iter()
                            .map(|&c| distance[c])
                            .min()
                            .unwrap_or(UNREACHABLE);
                        if best >= UNREACHABLE {
                            UNREACHABLE
                        } else {
                            best + 1
                        }
                    }
                    _ => {
                        let mut sum: u32 = 1;
                        for &c in &children[i] {
                            if distance[c] >= UNREACHABLE {
                                sum = UNREACHABLE;
                                break;
                            }
                            sum = sum.saturating_add(distance[c]).min(UNREACHABLE);
                        }
                        sum
                    }
                };
                if candidate < distance[i] {
                    distance[i] = candidate;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for id in ids {
            if let Some(node) = self.node_mut(id) {
                node.distance = distance[id.index()];
            }
        }
        debug!(sweeps, "distance relaxation converged");
        sweeps
    }
}
