use alloc::{collections::VecDeque, string::String};
use core::{
    fmt::{self, Write},
    ptr::NonNull,
};

use crate::{links, Dir, Links, TreeNode, WavlTree};

impl<T> WavlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Writes the tree to `w` as a Graphviz digraph named `name`.
    ///
    /// Nodes are drawn level by level and labelled `key (rank/size)`. Missing children are
    /// drawn as points.
    pub fn dot<W: Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let Some(root) = self.root else {
            return write!(w, "digraph \"{name}\" {{}}");
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(usize),
        }

        writeln!(w, "digraph \"{name}\" {{")?;

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            write!(w, "  {{rank=same; ")?;

            for _ in 0..queue.len() {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let (key, node_links) = unsafe { (node.as_ref().key(), links(node)) };
                write!(
                    w,
                    "\"{key}\" [label=\"{key} ({}/{})\"]; ",
                    node_links.rank(),
                    node_links.size()
                )?;

                for dir in [Dir::Left, Dir::Right] {
                    match node_links.child(dir) {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };
                            writeln!(edges, "  \"{key}\" -> \"{child_key}\";")?;
                            queue.push_back(Item::Node(child));
                        }
                        None => {
                            writeln!(edges, "  \"{key}\" -> \"missing{missing}\";")?;
                            queue.push_back(Item::Missing(missing));
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;
        w.write_str("}\n")
    }
}
