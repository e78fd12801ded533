//! Networks and channel storages.
//!
//! A [`Network`] holds one [`RoutingTable`] per component kind.
//! [`ChannelStorage`] joins a routing table with a storage registry and
//! presents everything reachable on one channel as a single
//! [`IngredientStorage`], so the transfer algorithm can treat "the network"
//! like any other endpoint.

use crate::ingredient::{ComponentKind, IngredientComponent, MatchCondition, Quantity};
use crate::routing::{Resolution, RoutingTable};
use crate::storage::{IngredientStorage, StorageRegistry};

/// Routing tables of every component kind.
#[derive(Debug, Clone, Default)]
pub struct Network {
    tables: [RoutingTable; 3],
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, kind: ComponentKind) -> &RoutingTable {
        &self.tables[kind.index()]
    }

    pub fn table_mut(&mut self, kind: ComponentKind) -> &mut RoutingTable {
        &mut self.tables[kind.index()]
    }
}

/// Every storage reachable on one channel, in resolution order.
///
/// Committed inserts and extracts advance the round-robin cursor of each
/// priority bucket they visited. Simulated calls leave the table untouched.
pub struct ChannelStorage<'a, C: IngredientComponent> {
    table: &'a mut RoutingTable,
    registry: &'a mut StorageRegistry<C>,
    channel: i32,
    round_robin: bool,
}

impl<'a, C: IngredientComponent> ChannelStorage<'a, C> {
    pub fn new(
        table: &'a mut RoutingTable,
        registry: &'a mut StorageRegistry<C>,
        channel: i32,
        round_robin: bool,
    ) -> Self {
        Self {
            table,
            registry,
            channel,
            round_robin,
        }
    }

    fn resolution(&self) -> Resolution {
        self.table.resolve(self.channel, self.round_robin)
    }

    fn rotate(&mut self, visited: &[i32]) {
        if self.round_robin {
            for &priority in visited {
                self.table.advance(self.channel, priority);
            }
        }
    }

    fn gather(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance {
        let wanted = C::quantity(prototype);
        let mut kind: Option<C::Instance> = None;
        let mut got: Quantity = 0;
        let mut visited = Vec::new();

        for bucket in self.resolution().buckets {
            if got == wanted {
                break;
            }
            visited.push(bucket.priority);
            for pos in bucket.positions {
                if got == wanted {
                    break;
                }
                let Some(storage) = self.registry.get_mut(pos) else {
                    continue;
                };
                // Once a kind is found, later endpoints must yield the same kind.
                let taken = match &kind {
                    Some(k) => storage.extract_matching(
                        &C::with_quantity(k, wanted - got),
                        MatchCondition::EXACT.without_quantity(),
                        simulate,
                    ),
                    None => storage.extract_matching(
                        &C::with_quantity(prototype, wanted - got),
                        condition,
                        simulate,
                    ),
                };
                if !C::is_empty(&taken) {
                    got += C::quantity(&taken);
                    kind.get_or_insert(taken);
                }
            }
        }

        if !simulate {
            self.rotate(&visited);
        }
        kind.map(|k| C::with_quantity(&k, got)).unwrap_or_else(C::empty)
    }
}

impl<C: IngredientComponent> IngredientStorage<C> for ChannelStorage<'_, C> {
    fn iter(&self) -> Box<dyn Iterator<Item = C::Instance> + '_> {
        let held: Vec<C::Instance> = self
            .resolution()
            .iter()
            .filter_map(|(_, pos)| self.registry.get(pos))
            .flat_map(|storage| storage.iter().collect::<Vec<_>>())
            .collect();
        Box::new(held.into_iter())
    }

    fn max_quantity(&self) -> Quantity {
        self.resolution()
            .iter()
            .filter_map(|(_, pos)| self.registry.get(pos))
            .map(|storage| storage.max_quantity())
            .max()
            .unwrap_or(0)
    }

    fn insert(&mut self, instance: C::Instance, simulate: bool) -> C::Instance {
        let mut remaining = instance;
        let mut visited = Vec::new();
        for bucket in self.resolution().buckets {
            if C::is_empty(&remaining) {
                break;
            }
            visited.push(bucket.priority);
            for pos in bucket.positions {
                if C::is_empty(&remaining) {
                    break;
                }
                if let Some(storage) = self.registry.get_mut(pos) {
                    remaining = storage.insert(remaining, simulate);
                }
            }
        }
        if !simulate {
            self.rotate(&visited);
        }
        remaining
    }

    fn extract_matching(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance {
        let wanted = C::quantity(prototype);
        if wanted == 0 {
            return C::empty();
        }
        let loose = condition.without_quantity();
        if condition.quantity && C::quantity(&self.gather(prototype, loose, true)) < wanted {
            return C::empty();
        }
        self.gather(prototype, loose, simulate)
    }

    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> C::Instance {
        if max_quantity == 0 {
            return C::empty();
        }
        let first = self
            .resolution()
            .iter()
            .filter_map(|(_, pos)| self.registry.get(pos))
            .find_map(|storage| storage.iter().next());
        match first {
            Some(kind) => self.gather(
                &C::with_quantity(&kind, max_quantity),
                MatchCondition::EXACT.without_quantity(),
                simulate,
            ),
            None => C::empty(),
        }
    }
}
