/// Sharding independent triangles across rayon workers
use rayon::prelude::*;

use super::coef::Vertex;
use super::context::{PrimitiveStats, SetupContext};
use super::quad::QuadStage;
use super::state::PipelineState;

/// Three borrowed vertices of one triangle.
pub type TriangleRef<'a> = [Vertex<'a>; 3];

/// Set up `triangles` in parallel, `chunk_size` triangles per work item.
///
/// Each work item gets its own [`SetupContext`] and a fresh consumer from
/// `make_consumer`, so no setup state is shared between threads. Results
/// come back in input order, one per chunk.
pub fn setup_triangles_parallel<C, F>(
    state: &PipelineState,
    triangles: &[TriangleRef<'_>],
    chunk_size: usize,
    make_consumer: F,
) -> Vec<(C, PrimitiveStats)>
where
    C: QuadStage + Send,
    F: Fn() -> C + Sync,
{
    crate::perf_scope!("parallel triangle setup");
    triangles
        .par_chunks(chunk_size.max(1))
        .map(|chunk| {
            let mut ctx = SetupContext::new(state.clone());
            let mut consumer = make_consumer();
            ctx.prepare(&mut consumer);

            for &[v0, v1, v2] in chunk {
                ctx.setup_tri(&mut consumer, v0, v1, v2);
            }
            (consumer, ctx.stats())
        })
        .collect()
}
