//! 循環依賴偵測

use std::collections::{HashMap, HashSet, VecDeque};

/// 組合產品依賴圖：產品ID → 配方中的子件ID
pub type DependencyGraph<'a> = HashMap<&'a str, Vec<&'a str>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// 在組合產品圖中找出所有循環
///
/// 以深度優先走訪（顯式堆疊，不受呼叫堆疊深度限制），遇到進行中的節點即為
/// 一個循環。每個循環以完整路徑回傳，首尾為同一產品，例如 `[A, B, A]`。
/// 走訪順序依產品ID排序，結果可重現。不在圖中的子件視為原料。
pub fn find_cycles(graph: &DependencyGraph<'_>) -> Vec<Vec<String>> {
    let graph: HashMap<&str, Vec<&str>> = graph
        .iter()
        .map(|(node, children)| {
            let children = children
                .iter()
                .copied()
                .filter(|id| graph.contains_key(id))
                .collect();
            (*node, children)
        })
        .collect();

    let mut roots: Vec<&str> = graph.keys().copied().collect();
    roots.sort_unstable();

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut cycles = Vec::new();

    for root in roots {
        if marks.contains_key(root) {
            continue;
        }

        marks.insert(root, Mark::InProgress);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(&(node, next)) = stack.last() {
            let children = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if next >= children.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let child = children[next];

            match marks.get(child) {
                Some(Mark::InProgress) => {
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == child)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    path.push(child.to_string());
                    tracing::debug!("發現循環: {}", path.join(" -> "));
                    cycles.push(path);
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::InProgress);
                    stack.push((child, 0));
                }
            }
        }
    }

    cycles
}

/// 找出依賴循環的上游產品
///
/// 沿反向邊從循環成員往上走，回傳每個上游產品經由配方到達循環、再繞行一圈
/// 的路徑，例如 `ROOT → A ↔ B` 得到 `[ROOT, A, B, A]`。循環成員本身不列入。
pub fn upstream_of_cycles(graph: &DependencyGraph<'_>, cycles: &[Vec<String>]) -> Vec<Vec<String>> {
    // 循環成員 → 以該成員起首的循環路徑
    let mut rings: HashMap<&str, Vec<String>> = HashMap::new();
    for cycle in cycles {
        let ring = &cycle[..cycle.len().saturating_sub(1)];
        for (i, member) in ring.iter().enumerate() {
            rings.entry(member.as_str()).or_insert_with(|| {
                let mut path: Vec<String> = ring[i..].iter().chain(&ring[..i]).cloned().collect();
                path.push(member.clone());
                path
            });
        }
    }

    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (node, children) in graph {
        for child in children {
            parents.entry(*child).or_default().push(*node);
        }
    }

    let mut members: Vec<&str> = rings.keys().copied().collect();
    members.sort_unstable();
    let mut reached: HashSet<&str> = members.iter().copied().collect();
    let mut queue: VecDeque<&str> = members.into_iter().collect();
    // 上游產品 → 往循環方向的下一個產品
    let mut next_hop: HashMap<&str, &str> = HashMap::new();

    while let Some(node) = queue.pop_front() {
        let Some(ups) = parents.get(node) else {
            continue;
        };
        let mut ups = ups.clone();
        ups.sort_unstable();
        for up in ups {
            if reached.insert(up) {
                next_hop.insert(up, node);
                queue.push_back(up);
            }
        }
    }

    let mut upstream: Vec<&str> = next_hop.keys().copied().collect();
    upstream.sort_unstable();
    upstream
        .into_iter()
        .map(|start| {
            let mut path = vec![start.to_string()];
            let mut node = start;
            while let Some(&next) = next_hop.get(node) {
                path.push(next.to_string());
                node = next;
            }
            if let Some(ring) = rings.get(node) {
                path.extend(ring.iter().skip(1).cloned());
            }
            path
        })
        .collect()
}
