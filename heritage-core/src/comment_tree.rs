//! Assembles the threaded comment listing from a page of top level comments and the
//! replies that point at them.
//!
//! Threads are at most [`MAX_DEPTH`] levels below the top level comment. Replies whose
//! parent is not part of the given page (another page, deactivated, or itself a reply)
//! are left out of the threaded view, they are still reachable through the replies listing.

use std::collections::HashMap;

use crate::ids::CommentId;
use crate::model::comment::{Comment, CommentThread};

pub const MAX_DEPTH: usize = 1;

struct Node {
    comment: Comment,
    depth: usize,
    children: Vec<usize>,
}

pub fn assemble_threads(top_level: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
    let mut arena: Vec<Node> = Vec::with_capacity(top_level.len() + replies.len());
    let mut index: HashMap<CommentId, usize> = HashMap::with_capacity(top_level.len());
    let mut roots = Vec::with_capacity(top_level.len());

    for comment in top_level {
        let idx = arena.len();
        index.insert(comment.id, idx);
        roots.push(idx);
        arena.push(Node {
            comment,
            depth: 0,
            children: Vec::new(),
        });
    }

    let mut replies = replies;
    replies.sort_by_key(|r| r.created);

    for reply in replies {
        let Some(parent_idx) = reply.parent_id.and_then(|p| index.get(&p).copied()) else {
            continue;
        };

        let depth = arena[parent_idx].depth + 1;
        if depth > MAX_DEPTH {
            continue;
        }

        let idx = arena.len();
        index.insert(reply.id, idx);
        arena[parent_idx].children.push(idx);
        arena.push(Node {
            comment: reply,
            depth,
            children: Vec::new(),
        });
    }

    let mut slots: Vec<Option<Node>> = arena.into_iter().map(Some).collect();

    roots
        .into_iter()
        .filter_map(|root| {
            let node = slots[root].take()?;
            let replies = node
                .children
                .iter()
                .filter_map(|&child| slots[child].take().map(|n| n.comment))
                .collect();
            Some(CommentThread {
                comment: node.comment,
                replies,
            })
        })
        .collect()
}
