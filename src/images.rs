//! Image-inlining pass over a finished snapshot.
//!
//! Every element's background references are embedded, then `<img>` sources
//! are swapped for data URLs. Sibling subtrees are independent and are
//! processed concurrently; references inside one style value stay sequential.

use crate::dom::{Snapshot, SnapshotElement};
use crate::error::Result;
use crate::inliner;
use crate::loader::Loader;
use crate::util;
use futures::future::BoxFuture;

/// Style properties whose `url(...)` references are embedded
const BACKGROUND_PROPERTIES: [&str; 2] = ["background", "background-image"];

/// Embed every image resource referenced from `node` and its descendants.
/// Relative references resolve against `base_url`.
pub fn inline_all<'a>(
    node: &'a mut Snapshot,
    base_url: Option<&'a str>,
    loader: &'a dyn Loader,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let Snapshot::Element(element) = node else {
            return Ok(());
        };

        inline_background(element, base_url, loader).await?;
        if element.tag == "img" {
            return inline_image(element, base_url, loader).await;
        }

        let pending = element
            .children
            .iter_mut()
            .map(|child| inline_all(child, base_url, loader));
        futures::future::join_all(pending)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    })
}

async fn inline_background(element: &mut SnapshotElement, base_url: Option<&str>, loader: &dyn Loader) -> Result<()> {
    for property in BACKGROUND_PROPERTIES {
        let Some(value) = element.style.get(property).map(str::to_string) else {
            continue;
        };
        if !inliner::should_inline(&value) {
            continue;
        }
        let important = element.style.is_important(property);
        let inlined = inliner::inline_all(&value, base_url, loader).await?;
        element.style.set(property, &inlined, important);
    }
    Ok(())
}

async fn inline_image(element: &mut SnapshotElement, base_url: Option<&str>, loader: &dyn Loader) -> Result<()> {
    let Some(src) = element.attr("src").map(str::to_string) else {
        return Ok(());
    };
    if src.is_empty() || util::is_data_url(&src) {
        return Ok(());
    }

    let url = match base_url {
        Some(base) => util::resolve_url(&src, base),
        None => src.clone(),
    };
    let data = loader.load(&url).await?;
    element.set_attr("src", &util::data_as_url(&data, util::mime_type(&src)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchResponse, ResourceFetcher};
    use crate::loader::{LoadPolicy, ResourceLoader};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixed {
        status: u16,
        body: &'static [u8],
        delay: Option<Duration>,
    }

    impl ResourceFetcher for Fixed {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<FetchResponse>> {
            Box::pin(async move {
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                Ok(FetchResponse { status: self.status, body: self.body.to_vec() })
            })
        }
    }

    fn loader(status: u16, body: &'static [u8], policy: LoadPolicy) -> ResourceLoader {
        ResourceLoader::new(Arc::new(Fixed { status, body, delay: None }), policy)
    }

    fn background_tree() -> Snapshot {
        let mut div = SnapshotElement::new("div");
        div.style.set("background", "url(https://x/img.png)", false);
        let mut img = SnapshotElement::new("img");
        img.set_attr("src", "https://x/photo.jpg");
        div.children.push(Snapshot::Element(img));
        div.children.push(Snapshot::Text("caption".into()));
        Snapshot::Element(div)
    }

    #[tokio::test]
    async fn embeds_backgrounds_and_image_sources() {
        let mut tree = background_tree();
        inline_all(&mut tree, None, &loader(200, b"ABC", LoadPolicy::default())).await.unwrap();

        let div = tree.as_element().unwrap();
        let bg = div.style.get("background").unwrap();
        assert_eq!(bg, "url(data:image/png;base64,QUJD)");
        assert!(!bg.contains("https://x/img.png"));
        let img = div.children[0].as_element().unwrap();
        assert_eq!(img.attr("src"), Some("data:image/jpeg;base64,QUJD"));
    }

    #[tokio::test]
    async fn timeout_uses_placeholder() {
        let policy = LoadPolicy {
            image_placeholder: Some("data:image/png;base64,PLACEHOLDER".into()),
            ..Default::default()
        };
        let slow = Fixed { status: 200, body: b"late", delay: Some(Duration::from_millis(500)) };
        let loader = ResourceLoader::new(Arc::new(slow), policy).with_timeout(Duration::from_millis(10));

        let mut tree = background_tree();
        inline_all(&mut tree, None, &loader).await.unwrap();
        assert_eq!(
            tree.as_element().unwrap().style.get("background"),
            Some("url(data:image/png;base64,PLACEHOLDER)")
        );
    }

    #[tokio::test]
    async fn not_found_degrades_to_empty_payload() {
        let mut tree = background_tree();
        inline_all(&mut tree, None, &loader(404, b"", LoadPolicy::default())).await.unwrap();
        assert_eq!(
            tree.as_element().unwrap().style.get("background"),
            Some("url(data:image/png;base64,)")
        );
    }

    #[tokio::test]
    async fn background_image_keeps_priority() {
        let mut div = SnapshotElement::new("div");
        div.style.set("background-image", "url('a.gif')", true);
        let mut tree = Snapshot::Element(div);
        inline_all(&mut tree, None, &loader(200, b"GIF", LoadPolicy::default())).await.unwrap();

        let div = tree.as_element().unwrap();
        assert_eq!(div.style.get("background-image"), Some("url('data:image/gif;base64,R0lG')"));
        assert!(div.style.is_important("background-image"));
    }

    #[tokio::test]
    async fn relative_sources_resolve_against_base() {
        struct Echo;
        impl Loader for Echo {
            fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
                Box::pin(async move { Ok(url.len().to_string()) })
            }
        }

        let mut img = SnapshotElement::new("img");
        img.set_attr("src", "/a.png");
        let mut tree = Snapshot::Element(img);
        inline_all(&mut tree, Some("https://x.com/page/"), &Echo).await.unwrap();
        // "https://x.com/a.png" is 19 characters
        assert_eq!(tree.as_element().unwrap().attr("src"), Some("data:image/png;base64,19"));
    }

    #[tokio::test]
    async fn data_sources_are_left_alone() {
        let mut img = SnapshotElement::new("img");
        img.set_attr("src", util::TRANSPARENT_PIXEL);
        let mut tree = Snapshot::Element(img);
        let strict = LoadPolicy { strict: true, ..Default::default() };
        inline_all(&mut tree, None, &loader(404, b"", strict)).await.unwrap();
        assert_eq!(tree.as_element().unwrap().attr("src"), Some(util::TRANSPARENT_PIXEL));
    }
}
