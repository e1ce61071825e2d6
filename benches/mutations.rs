#[macro_use]
extern crate bencher;
extern crate domdiff;

use bencher::Bencher;

use domdiff::{Document, MutationDiff, Node};

const CHILDREN: usize = 100;

fn build_tree() -> (Document, Node, Vec<Node>) {
    let doc = Document::new();
    let mut root = doc.root();
    let mut nodes = Vec::with_capacity(CHILDREN);
    for i in 0..CHILDREN {
        let n = doc.create_element(&format!("n{}", i));
        root.append(&n);
        nodes.push(n);
    }
    (doc, root, nodes)
}

fn tracked_detach(diff: &mut MutationDiff, node: &Node) {
    let parent = node.parent().unwrap();
    let prev = node.previous_sibling();
    let next = node.next_sibling();
    node.clone().detach();
    diff.children(&parent, &[node.clone()], &[], prev.as_ref(), next.as_ref());
}

fn tracked_prepend(diff: &mut MutationDiff, parent: &Node, node: &Node) {
    let next = parent.first_child();
    parent.clone().prepend(node);
    diff.children(parent, &[], &[node.clone()], None, next.as_ref());
}

// every third child is moved to the front, then everything is reverted
fn shuffle_and_revert(bencher: &mut Bencher) {
    bencher.iter(|| {
        let (_doc, root, nodes) = build_tree();
        let mut diff = MutationDiff::new();

        for node in nodes.iter().step_by(3) {
            tracked_detach(&mut diff, node);
            tracked_prepend(&mut diff, &root, node);
        }

        diff.revert(None).unwrap();
        assert!(!diff.mutated(None));
    })
}

// a full rotation brings every child back to its original position
fn rotation_collapses(bencher: &mut Bencher) {
    bencher.iter(|| {
        let (_doc, root, nodes) = build_tree();
        let mut diff = MutationDiff::new();

        for node in &nodes {
            tracked_detach(&mut diff, node);
            let prev = root.last_child();
            root.clone().append(node);
            diff.children(&root, &[], &[node.clone()], prev.as_ref(), None);
        }

        assert_eq!(diff.storage_size(), 0);
    })
}

benchmark_group!(benches, shuffle_and_revert, rotation_collapses);
benchmark_main!(benches);
