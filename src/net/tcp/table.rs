use std::collections::BTreeMap;

use super::connection::Connection;
use super::traits::{ConnectionId, FIRST_CONNECTION_TOKEN};

/// Live connections keyed by [`ConnectionId`].
///
/// Ids grow monotonically, so iteration follows accept order.
pub struct ConnectionTable<S> {
    connections: BTreeMap<ConnectionId, Connection<S>>,
    next_id: u64,
}

impl<S> Default for ConnectionTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ConnectionTable<S> {
    pub fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
            next_id: FIRST_CONNECTION_TOKEN as u64,
        }
    }

    /// Hands out a fresh id; ids are never reused.
    pub fn allocate_id(&mut self) -> ConnectionId {
        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, id: ConnectionId, connection: Connection<S>) {
        self.connections.insert(id, connection);
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection<S>> {
        self.connections.get_mut(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection<S>> {
        self.connections.remove(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ConnectionId, &mut Connection<S>)> {
        self.connections.iter_mut().map(|(id, conn)| (*id, conn))
    }

    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::tcp::mock::MockStream;
    use mio::Interest;

    fn insert_new(table: &mut ConnectionTable<MockStream>) -> ConnectionId {
        let id = table.allocate_id();
        let conn = Connection::new(
            id,
            MockStream::new(),
            "127.0.0.1:5000".parse().unwrap(),
            Interest::READABLE,
        );
        table.insert(id, conn);
        id
    }

    #[test]
    fn test_ids_are_unique_and_skip_reserved_tokens() {
        let mut table = ConnectionTable::<MockStream>::new();
        let first = insert_new(&mut table);
        let second = insert_new(&mut table);

        assert_eq!(first.as_u64(), FIRST_CONNECTION_TOKEN as u64);
        assert!(second > first);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut table = ConnectionTable::<MockStream>::new();
        let first = insert_new(&mut table);
        assert!(table.remove(first).is_some());
        assert!(table.remove(first).is_none());

        let next = insert_new(&mut table);
        assert_ne!(next, first);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_iteration_follows_accept_order() {
        let mut table = ConnectionTable::<MockStream>::new();
        let ids: Vec<_> = (0..4).map(|_| insert_new(&mut table)).collect();
        table.remove(ids[1]);

        let seen: Vec<_> = table.ids().collect();
        assert_eq!(seen, vec![ids[0], ids[2], ids[3]]);
    }
}
