//! The transient-for relation and its wait list.
//!
//! Transience forms (ideally) a forest over the client arena. Clients
//! declare it asynchronously — often before the window they point at exists
//! — so unresolved declarations park in a wait list keyed by the target
//! handle until that window is adopted. Cycles are protocol garbage; they
//! are broken by truncating the offending link the moment a declaration
//! would close a loop.

use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::common::collections::HashMap;
use crate::model::client::{Client, ClientId};
use crate::sys::window_server::WindowHandle;

/// Clients whose transient-for target has no live Client yet, keyed by the
/// unresolved handle. Reactor-scoped; entries are cleared one by one as they
/// resolve and the whole thing drains on shutdown.
#[derive(Debug, Default)]
pub struct TransientWaitList {
    waiting: HashMap<WindowHandle, Vec<ClientId>>,
}

impl TransientWaitList {
    /// Parks `client` until `target` comes alive. Any earlier registration
    /// for this client — a previous target that never appeared — is dropped
    /// first; a client waits on at most one handle.
    pub fn register(&mut self, target: WindowHandle, client: ClientId) {
        self.remove_waiter(client);
        self.waiting.entry(target).or_default().push(client);
    }

    /// Takes every client that was waiting for `target`. Called when the
    /// target's Client is created.
    pub fn resolve(&mut self, target: WindowHandle) -> Vec<ClientId> {
        self.waiting.remove(&target).unwrap_or_default()
    }

    /// Drops `client` from whatever it was waiting on.
    pub fn remove_waiter(&mut self, client: ClientId) {
        self.waiting.retain(|_, waiters| {
            waiters.retain(|&c| c != client);
            !waiters.is_empty()
        });
    }

    /// Forgets a target outright; used when the handle's window is destroyed
    /// without ever being adopted, or at shutdown.
    pub fn forget_target(&mut self, target: WindowHandle) {
        self.waiting.remove(&target);
    }

    pub fn waiters(&self, target: WindowHandle) -> &[ClientId] {
        self.waiting.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool { self.waiting.is_empty() }

    pub fn len(&self) -> usize { self.waiting.values().map(Vec::len).sum() }

    pub fn clear(&mut self) { self.waiting.clear(); }
}

/// Follows transient-for links to the root of `id`'s chain. Terminates on
/// arbitrary input: a link that would revisit a node is treated as the end
/// of the chain (and flagged, since declaration-time truncation should have
/// prevented it).
pub fn root_transient_for(clients: &SlotMap<ClientId, Client>, id: ClientId) -> ClientId {
    let mut seen = vec![id];
    let mut current = id;
    while let Some(parent) = clients.get(current).and_then(|c| c.transient_for) {
        if seen.contains(&parent) {
            warn!(?current, ?parent, "transient chain loops; treating as root");
            break;
        }
        seen.push(parent);
        current = parent;
    }
    current
}

/// Unlinks `id` from its parent: clears the forward link, removes the
/// back-reference, and releases the modal hold if one was in place.
pub fn detach_from_parent(clients: &mut SlotMap<ClientId, Client>, id: ClientId) {
    let Some(parent) = clients.get(id).and_then(|c| c.transient_for) else {
        return;
    };
    let modal = clients.get(id).map(|c| c.modal).unwrap_or(false);
    if let Some(parent) = clients.get_mut(parent) {
        parent.transients.retain(|&c| c != id);
        if modal {
            parent.remove_modal();
        }
    }
    if let Some(client) = clients.get_mut(id) {
        client.transient_for = None;
    }
}

/// Orphans every transient of `id`; called when `id` is destroyed. The
/// children keep their declared handle, so a reincarnation of the window can
/// pick them back up through the wait list.
pub fn release_transients(clients: &mut SlotMap<ClientId, Client>, id: ClientId) {
    let children = clients.get(id).map(|c| c.transients.clone()).unwrap_or_default();
    for child in children {
        if let Some(child) = clients.get_mut(child) {
            child.transient_for = None;
        }
    }
    if let Some(client) = clients.get_mut(id) {
        client.transients.clear();
    }
}

/// Re-points `id`'s transient-for declaration.
///
/// The old link is dropped first. A resolvable target is linked after the
/// chain above `id` is walked and any link closing a loop back to `id` is
/// truncated; an unresolvable one parks `id` in the wait list. Declaring
/// transience on oneself is refused outright.
pub fn set_transient_for(
    clients: &mut SlotMap<ClientId, Client>,
    wait: &mut TransientWaitList,
    index: &HashMap<WindowHandle, ClientId>,
    id: ClientId,
    target: Option<WindowHandle>,
) {
    detach_from_parent(clients, id);

    let own_handle = match clients.get_mut(id) {
        Some(client) => {
            client.transient_for_handle = target;
            client.handle()
        }
        None => return,
    };

    let Some(target) = target else {
        wait.remove_waiter(id);
        return;
    };

    if target == own_handle {
        debug!(%target, "window declared transient for itself; ignoring");
        if let Some(client) = clients.get_mut(id) {
            client.transient_for_handle = None;
        }
        wait.remove_waiter(id);
        return;
    }

    let Some(&parent) = index.get(&target) else {
        trace!(%target, "transient-for target not managed yet; queuing");
        wait.register(target, id);
        return;
    };
    wait.remove_waiter(id);

    // Link, then make sure the chain above does not now run back into us.
    if let Some(client) = clients.get_mut(id) {
        client.transient_for = Some(parent);
    }
    let mut seen = vec![id];
    let mut current = id;
    loop {
        let Some(next) = clients.get(current).and_then(|c| c.transient_for) else {
            break;
        };
        if next == id {
            warn!(?current, "truncating transient cycle");
            detach_if_linked(clients, current, id);
            break;
        }
        if seen.contains(&next) {
            // can't happen while the acyclicity invariant holds
            warn!(?next, "transient chain loops past the declarer");
            break;
        }
        seen.push(next);
        current = next;
    }

    if clients.get(id).and_then(|c| c.transient_for) == Some(parent) {
        let modal = clients.get(id).map(|c| c.modal).unwrap_or(false);
        if let Some(parent) = clients.get_mut(parent) {
            parent.transients.push(id);
            if modal {
                parent.add_modal();
            }
        }
    }
}

/// Clears `current`'s forward link (known to point at `ancestor`), back
/// reference and modal hold included.
fn detach_if_linked(
    clients: &mut SlotMap<ClientId, Client>,
    current: ClientId,
    ancestor: ClientId,
) {
    if clients.get(current).and_then(|c| c.transient_for) == Some(ancestor) {
        detach_from_parent(clients, current);
    }
}

/// Renders the transient tree under `root` for diagnostics.
pub fn draw_tree(clients: &SlotMap<ClientId, Client>, root: ClientId) -> String {
    fn node(clients: &SlotMap<ClientId, Client>, id: ClientId) -> ascii_tree::Tree {
        let Some(client) = clients.get(id) else {
            return ascii_tree::Tree::Leaf(vec!["<dead>".to_string()]);
        };
        let desc = format!("{} \"{}\"", client.handle(), client.title());
        if client.transients().is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            let children =
                client.transients().iter().map(|&c| node(clients, c)).collect();
            ascii_tree::Tree::Node(desc, children)
        }
    }
    let mut out = String::new();
    let _ = ascii_tree::write_tree(&mut out, &node(clients, root));
    out
}
