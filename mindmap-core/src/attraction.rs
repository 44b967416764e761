//! Cosmetic "attraction" animation.
//!
//! `start` saves every node position and connector geometry, `tick` jitters
//! nodes around their saved position and reroutes connectors, `stop` puts the
//! saved state back bit for bit. The host drives `tick` from its own timer.

use std::collections::BTreeMap;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{PointF, Segment};
use crate::model::{EdgeId, MindMap, NodeId};

#[derive(Debug, Clone)]
struct Saved {
    positions: BTreeMap<NodeId, PointF>,
    connectors: BTreeMap<EdgeId, [Segment; 3]>,
}

#[derive(Debug, Clone)]
pub struct Attraction {
    rng: StdRng,
    amplitude: f64,
    saved: Option<Saved>,
}

impl Attraction {
    pub fn new(amplitude: f64, seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), amplitude: amplitude.abs(), saved: None }
    }

    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Save the current state. A second call while active does nothing.
    pub fn start(&mut self, graph: &MindMap) {
        if self.saved.is_some() {
            return;
        }
        debug!("attraction: start ({} nodes)", graph.node_count());
        self.saved = Some(Saved {
            positions: graph.positions(),
            connectors: graph.connector_geometry(),
        });
    }

    /// Offset every saved node by a random amount within the amplitude.
    pub fn tick(&mut self, graph: &mut MindMap) {
        let Some(saved) = &self.saved else { return };
        if self.amplitude == 0.0 {
            return;
        }
        for (nid, home) in &saved.positions {
            let dx = self.rng.gen_range(-self.amplitude..=self.amplitude);
            let dy = self.rng.gen_range(-self.amplitude..=self.amplitude);
            let _ = graph.set_position_raw(*nid, home.offset(dx, dy));
        }
        graph.refresh_all_edges();
    }

    /// Drop the saved state without restoring it (the graph was replaced).
    pub fn discard(&mut self) {
        self.saved = None;
    }

    /// Restore the saved state. Nodes deleted meanwhile are skipped.
    pub fn stop(&mut self, graph: &mut MindMap) {
        let Some(saved) = self.saved.take() else { return };
        debug!("attraction: stop");
        for (nid, home) in saved.positions {
            let _ = graph.set_position_raw(nid, home);
        }
        for (eid, segments) in saved.connectors {
            let _ = graph.set_connector(eid, segments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> MindMap {
        let mut g = MindMap::default();
        let a = g.add_node("a", PointF::new(0.0, 0.0));
        let b = g.add_node("b", PointF::new(168.0, 40.0));
        g.connect(a, b).unwrap();
        g
    }

    #[test]
    fn test_tick_stays_within_amplitude() {
        let mut g = graph();
        let home = g.positions();
        let mut attr = Attraction::new(3.0, 7);
        attr.start(&g);
        for _ in 0..20 {
            attr.tick(&mut g);
            for (id, p) in g.positions() {
                assert!((p.x - home[&id].x).abs() <= 3.0);
                assert!((p.y - home[&id].y).abs() <= 3.0);
            }
        }
        assert_ne!(g.positions(), home);
    }

    #[test]
    fn test_stop_restores_exactly() {
        let mut g = graph();
        let home = g.positions();
        let connectors = g.connector_geometry();
        let mut attr = Attraction::new(3.0, 1);
        attr.start(&g);
        attr.tick(&mut g);
        attr.start(&g);
        attr.tick(&mut g);
        attr.stop(&mut g);
        assert_eq!(g.positions(), home);
        assert_eq!(g.connector_geometry(), connectors);
        assert!(!attr.is_active());
        attr.stop(&mut g);
        assert_eq!(g.positions(), home);
    }

    #[test]
    fn test_tick_when_idle_is_a_no_op() {
        let mut g = graph();
        let home = g.positions();
        Attraction::new(3.0, 1).tick(&mut g);
        assert_eq!(g.positions(), home);
    }
}
