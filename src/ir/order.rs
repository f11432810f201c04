//! Recalculation order: a post-order depth-first walk from the output
//! object, so every object comes after the objects it reads.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// A dependency cycle through `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub object: usize,
}

/// Order the objects reachable from `root`. `dependencies[i]` lists the
/// objects that object `i` reads. Objects not reachable from `root` are
/// left out.
pub fn recalculation_order(dependencies: &[Vec<usize>], root: usize) -> Result<Vec<usize>, Cycle> {
    let mut marks = vec![Mark::Unvisited; dependencies.len()];
    let mut order = Vec::with_capacity(dependencies.len());
    if root >= dependencies.len() {
        return Ok(order);
    }

    // Each frame is an object and the index of its next dependency.
    let mut stack = vec![(root, 0)];
    marks[root] = Mark::OnStack;
    while let Some(frame) = stack.last_mut() {
        let (object, next) = *frame;
        let Some(&dep) = dependencies[object].get(next) else {
            marks[object] = Mark::Done;
            order.push(object);
            stack.pop();
            continue;
        };
        frame.1 += 1;
        match marks.get(dep) {
            Some(Mark::Done) | None => {}
            Some(Mark::OnStack) => return Err(Cycle { object: dep }),
            Some(Mark::Unvisited) => {
                marks[dep] = Mark::OnStack;
                stack.push((dep, 0));
            }
        }
    }
    Ok(order)
}
