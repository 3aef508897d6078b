use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

pub mod layout {
    use divan::Bencher;
    use rage_resource::block::BlockId;
    use rage_resource::classify::classify;
    use rage_resource::collections::PointerArray64;
    use rage_resource::graph::ResourceGraph;
    use rage_resource::layout::PageAllocator;
    use rage_resource::scalar::StringBlock;
    use rage_resource::Segment;

    /// A table of `count` pointers to strings, half of them shared
    fn get_input(count: usize) -> (ResourceGraph, BlockId) {
        let mut graph = ResourceGraph::new();

        let names = (0..count / 2)
            .map(|i| graph.insert(StringBlock(format!("block_{i}"))))
            .collect::<Vec<_>>();
        let table = (0..count)
            .map(|i| names.get(i % names.len().max(1)).copied())
            .collect::<PointerArray64<StringBlock>>();

        let root = graph.insert(table).id();
        (graph, root)
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn classify_table(bencher: Bencher, count: usize) {
        bencher
            .with_inputs(|| get_input(count))
            .bench_refs(|(graph, root)| {
                divan::black_box(classify(graph, *root));
            });
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn allocate_table(bencher: Bencher, count: usize) {
        bencher
            .with_inputs(|| {
                let (graph, root) = get_input(count);
                let blocks = classify(&graph, root).system.into_iter().collect::<Vec<_>>();
                (graph, blocks)
            })
            .bench_refs(|(graph, blocks)| {
                divan::black_box(
                    PageAllocator::default()
                        .allocate(graph, blocks, Segment::System.base())
                        .unwrap(),
                );
            });
    }
}
