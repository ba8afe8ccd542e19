//! Thread reconstruction over the reply forest
//!
//! Messages form a forest through `parent_message_id`. Reconstruction walks
//! upward to find the thread root, then gathers every transitive reply into a
//! nested tree. Both directions are iterative; deep threads must not be able
//! to blow the stack, so no recursion anywhere in this module.
//!
//! Sibling order is (timestamp ASC, id ASC); the id tie-break keeps results
//! deterministic when timestamps collide. Callers run both phases inside one
//! transaction so the tree reflects a consistent snapshot.

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::Connection;

use crate::db::Database;
use crate::error::{ChatLedgerError, Result};
use crate::models::{Message, MessageThread, ThreadNode};

/// Follow parent references upward from `message_id` until a message with no
/// parent is reached.
///
/// Threads are acyclic by construction (a message's parent must already exist
/// when it is created), but a visited set guards the walk against corrupt
/// data anyway.
pub fn thread_root(conn: &Connection, message_id: i64) -> Result<Message> {
    let mut current = Database::message_by_id(conn, message_id)?
        .ok_or(ChatLedgerError::MessageNotFound(message_id))?;

    let mut seen = HashSet::from([current.id]);
    while let Some(parent_id) = current.parent_message_id {
        if !seen.insert(parent_id) {
            return Err(ChatLedgerError::Other(format!(
                "parent cycle detected at message {parent_id}"
            )));
        }
        current = Database::message_by_id(conn, parent_id)?
            .ok_or(ChatLedgerError::MessageNotFound(parent_id))?;
    }

    Ok(current)
}

/// Build the nested reply tree below `root_id`.
///
/// Direct replies of the root have depth 0, their replies depth 1, and so on.
/// Every reply reachable through `parent_message_id` appears exactly once;
/// the visited set drops any row a racing insert could surface twice.
pub fn reply_tree(conn: &Connection, root_id: i64) -> Result<Vec<ThreadNode>> {
    // Breadth-first collection: parents are visited before their children,
    // siblings arrive already in (timestamp, id) order.
    let mut order: Vec<(Message, i64, usize)> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::from([root_id]);
    let mut worklist: VecDeque<(i64, usize)> = VecDeque::from([(root_id, 0)]);

    while let Some((parent_id, depth)) = worklist.pop_front() {
        for reply in Database::replies_to(conn, parent_id)? {
            if !seen.insert(reply.id) {
                continue;
            }
            worklist.push_back((reply.id, depth + 1));
            order.push((reply, parent_id, depth));
        }
    }

    // Assemble bottom-up: a reverse sweep over BFS order sees every node's
    // children before the node itself, so subtrees are complete when moved
    // under their parent. The sweep collects siblings newest-first, hence the
    // reverse before attaching.
    let mut built: HashMap<i64, Vec<ThreadNode>> = HashMap::new();
    for (message, parent_id, depth) in order.into_iter().rev() {
        let mut replies = built.remove(&message.id).unwrap_or_default();
        replies.reverse();
        built.entry(parent_id).or_default().push(ThreadNode {
            message,
            depth,
            replies,
        });
    }

    let mut top = built.remove(&root_id).unwrap_or_default();
    top.reverse();
    Ok(top)
}

/// Reconstruct the full thread containing `message_id`: resolve the root,
/// then gather the nested reply tree below it.
pub fn build_thread(conn: &Connection, message_id: i64) -> Result<MessageThread> {
    let root = thread_root(conn, message_id)?;
    let replies = reply_tree(conn, root.id)?;
    Ok(MessageThread { root, replies })
}

/// Flatten a reply tree into (depth, message id) pairs in display order.
/// Useful for indented rendering without walking the tree again.
#[must_use]
pub fn flatten(nodes: &[ThreadNode]) -> Vec<(usize, i64)> {
    let mut out = Vec::new();
    let mut stack: Vec<&ThreadNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push((node.depth, node.message.id));
        for child in node.replies.iter().rev() {
            stack.push(child);
        }
    }
    out
}
