use criterion::{criterion_group, criterion_main, Criterion};
use futures::future::BoxFuture;
use rfcapture::{CaptureOptions, Capturer, Element, FetchResponse, InlineStyleEngine, NodeId, ResourceFetcher, SourceNode};
use std::sync::Arc;

// Run with:
//    cargo bench

struct LocalFetcher;

impl ResourceFetcher for LocalFetcher {
    fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, rfcapture::Result<FetchResponse>> {
        Box::pin(async { Ok(FetchResponse::ok(vec![7u8; 512])) })
    }
}

/// A list of `rows` styled rows, each with a background reference
fn table(rows: usize) -> SourceNode {
    let mut root = Element::new(NodeId(0), "ul").with_attr("style", "width: 400px; height: 600px");
    for i in 0..rows {
        let row = Element::new(NodeId(i + 1), "li")
            .with_attr(
                "style",
                &format!("color: #333; background: url(https://cdn.example/row{}.png) no-repeat", i % 8),
            )
            .with_child(SourceNode::Text(format!("row {}", i)));
        root = root.with_child(SourceNode::Element(row));
    }
    SourceNode::Element(root)
}

fn bench_find_references(c: &mut Criterion) {
    let css = (0..64)
        .map(|i| format!(".r{} {{ background: url('https://cdn.example/{}.png') }}", i, i))
        .collect::<Vec<_>>()
        .join("\n");
    c.bench_function("find_references_64", |b| {
        b.iter(|| rfcapture::inliner::find_references(&css).len())
    });
}

fn bench_to_svg(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let node = table(200);
    let capturer = Capturer::with_fetcher(&InlineStyleEngine, Arc::new(LocalFetcher));
    let options = CaptureOptions::default();

    c.bench_function("to_svg_200_rows", |b| {
        b.iter(|| runtime.block_on(capturer.to_svg(&node, &options)).unwrap().len())
    });
}

fn bench_pixel_data(c: &mut Criterion) {
    let mut surface = rfcapture::Surface::new(256, 256).unwrap();
    surface.fill_css("rebeccapurple").unwrap();
    c.bench_function("surface_png_256", |b| b.iter(|| surface.to_png().unwrap().len()));
}

criterion_group!(benches, bench_find_references, bench_to_svg, bench_pixel_data);
criterion_main!(benches);
