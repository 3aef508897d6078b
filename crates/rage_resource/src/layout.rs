//! Placement of top-level blocks into fixed size pages.
//!
//! The engine maps each segment through a page table of at most
//! [`LayoutOptions::max_pages`] entries, all pages sharing one power of two
//! size. Blocks are packed first fit in the order given: every block is
//! followed by a skip margin and the cursor is rounded up to the alignment.
//! A block that does not fit in what is left of the current page moves to the
//! start of the next one. When the pages needed reach the ceiling the page
//! size is doubled and the layout restarts from scratch.
//!
//! Every block has to end below [`Segment::MAX_OFFSET`]. A layout that
//! overruns the segment is rejected outright.

use bon::Builder;
use tracing::{debug, instrument, trace};

use crate::address::{Segment, VirtualAddress};
use crate::block::BlockId;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;

/// Parameters of the page table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct LayoutOptions {
    /// Smallest page size tried, rounded up to a power of two
    #[builder(default = 0x2000)]
    pub page_floor: u64,

    /// Bytes left free after every block
    #[builder(default = 64)]
    pub skip_margin: u64,

    /// Every block starts on a multiple of this
    #[builder(default = 64)]
    pub alignment: u64,

    /// A layout is accepted only when it needs fewer pages than this
    #[builder(default = 128)]
    pub max_pages: u64,

    /// How many times the page size may be doubled before giving up
    #[builder(default = 16)]
    pub max_escalations: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The page table chosen for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageLayout {
    /// Size of every page, a power of two
    pub page_size: u64,

    /// Number of pages in use
    pub page_count: u64,
}

impl PageLayout {
    /// Bytes spanned by all pages
    pub fn size(&self) -> u64 {
        self.page_size * self.page_count
    }
}

/// Assigns positions to top-level blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct PageAllocator {
    options: LayoutOptions,
}

impl PageAllocator {
    /// Create an allocator using `options`
    pub fn new(options: LayoutOptions) -> Self {
        PageAllocator { options }
    }

    /// The parameters this allocator was built with
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Position `blocks` starting at `base` and return the page table used.
    ///
    /// On failure every block is left without a position.
    #[instrument(skip(self, graph, blocks), fields(count = blocks.len()), err)]
    pub fn allocate(
        &self,
        graph: &mut ResourceGraph,
        blocks: &[BlockId],
        base: VirtualAddress,
    ) -> Result<PageLayout> {
        let largest = blocks.iter().map(|id| graph.length(*id)).max();
        let mut page_size = self.options.page_floor.max(1).next_power_of_two();

        let Some(largest) = largest else {
            return Ok(PageLayout {
                page_size,
                page_count: 0,
            });
        };

        while page_size < largest {
            page_size *= 2;
        }

        for escalation in 0..=self.options.max_escalations {
            let page_count = match self.place(graph, blocks, base, page_size) {
                Ok(page_count) => page_count,
                Err(err) => {
                    clear(graph, blocks)?;
                    return Err(err);
                }
            };

            if page_count < self.options.max_pages {
                debug!(page_size, page_count, escalation, "layout accepted");
                return Ok(PageLayout {
                    page_size,
                    page_count,
                });
            }

            trace!(page_size, page_count, "too many pages, doubling page size");
            page_size *= 2;
        }

        clear(graph, blocks)?;
        Err(Error::UnresolvableLayout {
            max_pages: self.options.max_pages,
            escalations: self.options.max_escalations,
        })
    }

    /// Lay `blocks` out with a fixed page size and return the number of pages used.
    ///
    /// Fails with [`Error::InvalidAddress`] when a block would run past the
    /// end of the segment.
    pub fn place(
        &self,
        graph: &mut ResourceGraph,
        blocks: &[BlockId],
        base: VirtualAddress,
        page_size: u64,
    ) -> Result<u64> {
        clear(graph, blocks)?;

        let mut page_count = 0;
        let mut cursor = 0;
        for id in blocks {
            let length = graph.length(*id);
            let room = (page_count * page_size).saturating_sub(cursor);
            if room < length + self.options.skip_margin {
                page_count += 1;
                cursor = page_size * (page_count - 1);
            }

            let start = base.offset(cursor)?;
            start.offset(length)?;

            graph.set_position(*id, Some(start))?;
            cursor = align(cursor + length + self.options.skip_margin, self.options.alignment);
        }

        Ok(page_count)
    }
}

fn clear(graph: &mut ResourceGraph, blocks: &[BlockId]) -> Result<()> {
    for id in blocks {
        graph.set_position(*id, None)?;
    }
    Ok(())
}

fn align(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::address::{Segment, VirtualAddress};
    use crate::block::{BlockId, ResourceBlock};
    use crate::error::{Error, Result};
    use crate::graph::ResourceGraph;
    use crate::layout::{LayoutOptions, PageAllocator, PageLayout};
    use crate::scalar::GraphicsBuffer;
    use crate::write::ResourceWriter;

    fn blocks(graph: &mut ResourceGraph, count: usize, length: usize) -> Vec<BlockId> {
        (0..count)
            .map(|_| graph.insert(GraphicsBuffer(vec![0; length])).id())
            .collect()
    }

    /// Reports a length without holding any bytes
    #[derive(Debug)]
    struct Extent(u64);

    impl ResourceBlock for Extent {
        fn length(&self, _graph: &ResourceGraph) -> u64 {
            self.0
        }

        fn write(&self, writer: &mut ResourceWriter<'_>, _graph: &ResourceGraph) -> Result<()> {
            writer.write_padding(self.0 as usize)
        }
    }

    #[traced_test]
    #[test]
    fn two_hundred_small_blocks() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 200, 100);
        let base = Segment::System.base();

        let layout = PageAllocator::default().allocate(&mut graph, &ids, base)?;

        // 192 byte stride, 42 blocks per page
        assert_eq!(layout, PageLayout { page_size: 0x2000, page_count: 5 });
        assert_eq!(graph.position(ids[41]), Some(base.offset(41 * 192)?));
        assert_eq!(graph.position(ids[42]), Some(base.offset(0x2000)?));
        assert_eq!(graph.position(ids[199]), Some(base.offset(0x9740)?));

        Ok(())
    }

    #[test]
    fn page_size_escalates() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 200, 0x3000);
        let base = Segment::Graphics.base();

        let layout = PageAllocator::default().allocate(&mut graph, &ids, base)?;

        assert_eq!(layout, PageLayout { page_size: 0x8000, page_count: 100 });
        assert_eq!(graph.position(ids[1]), Some(base.offset(0x3040)?));
        assert_eq!(graph.position(ids[2]), Some(base.offset(0x8000)?));

        Ok(())
    }

    #[test]
    fn page_count_shrinks_as_page_size_grows() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 500, 1000);
        let allocator = PageAllocator::default();

        let counts = [0x2000, 0x4000, 0x8000, 0x10000]
            .into_iter()
            .map(|page_size| allocator.place(&mut graph, &ids, Segment::System.base(), page_size))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(counts, vec![72, 34, 17, 9]);
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));

        Ok(())
    }

    #[test]
    fn blocks_are_aligned_and_disjoint() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = [10, 5000, 64, 8000, 1, 300, 7000, 129]
            .into_iter()
            .map(|length| graph.insert(GraphicsBuffer(vec![0; length])).id())
            .collect::<Vec<_>>();
        let base = Segment::System.base();

        let layout = PageAllocator::default().allocate(&mut graph, &ids, base)?;

        let mut ranges = Vec::new();
        for id in &ids {
            let start = graph.address_of(*id)?.raw() - base.raw();
            let end = start + graph.length(*id);
            assert_eq!(start % 64, 0);
            assert!(end <= layout.size());
            ranges.push((start, end));
        }

        ranges.sort();
        assert!(ranges.windows(2).all(|w| w[0].1 + 64 <= w[1].0));

        Ok(())
    }

    #[test]
    fn empty_set_needs_no_pages() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let layout = PageAllocator::default().allocate(&mut graph, &[], Segment::System.base())?;

        assert_eq!(layout, PageLayout { page_size: 0x2000, page_count: 0 });
        assert_eq!(layout.size(), 0);

        Ok(())
    }

    #[test]
    fn starting_page_size_fits_largest_block() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 1, 0x5000);

        let layout = PageAllocator::default().allocate(&mut graph, &ids, Segment::System.base())?;

        assert_eq!(layout, PageLayout { page_size: 0x8000, page_count: 1 });

        Ok(())
    }

    #[test]
    fn unresolvable_layout_is_bounded() {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 4, 100);
        let options = LayoutOptions::builder().max_pages(1).max_escalations(3).build();

        let result = PageAllocator::new(options).allocate(&mut graph, &ids, Segment::System.base());

        assert!(matches!(
            result,
            Err(Error::UnresolvableLayout { max_pages: 1, escalations: 3 })
        ));
        assert!(ids.iter().all(|id| graph.position(*id).is_none()));
    }

    #[test]
    fn positions_use_base() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let ids = blocks(&mut graph, 2, 10);
        let base = VirtualAddress::new(Segment::Graphics, 0)?;

        PageAllocator::default().allocate(&mut graph, &ids, base)?;

        assert_eq!(graph.position(ids[0]).map(|p| p.raw()), Some(0x6000_0000));
        assert_eq!(graph.position(ids[1]).map(|p| p.raw()), Some(0x6000_0080));

        Ok(())
    }

    #[test]
    fn segment_overrun_is_rejected() {
        let mut graph = ResourceGraph::new();
        let ids = (0..3)
            .map(|_| graph.insert(Extent(0x0800_0000)).id())
            .collect::<Vec<_>>();

        let result = PageAllocator::default().allocate(&mut graph, &ids, Segment::Graphics.base());

        // the third page would start at 0x70000000, inside the system tag
        assert!(matches!(result, Err(Error::InvalidAddress(0x7000_0000))));
        assert!(ids.iter().all(|id| graph.position(*id).is_none()));
    }

    #[test]
    fn block_ending_at_segment_limit_is_rejected() {
        let mut graph = ResourceGraph::new();
        let ids = [graph.insert(Extent(0x80)).id()];
        let base = Segment::System.base().offset(Segment::MAX_OFFSET - 0x80);

        let result = base.and_then(|base| PageAllocator::default().allocate(&mut graph, &ids, base));

        assert!(matches!(result, Err(Error::InvalidAddress(_))));
    }
}
