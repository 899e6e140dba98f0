//! Route fan-out: one entrypoint, one or more pages.

use crate::logic::{LogicContext, LogicError, PageLogic, SlugArgs};
use crate::models::{Page, Variables};
use crate::uri::variant_output_uri;

/// Expand `base` into the pages its logic asks for.
///
/// Without a slug mapping the base page is returned alone with the variables
/// for an empty [`SlugArgs`]. With a mapping, each entry becomes its own page
/// at `dirname(base.output_uri)/<slug>/index.html`. An empty mapping yields
/// no pages.
pub fn expand(
    base: Page,
    logic: &dyn PageLogic,
    ctx: &LogicContext<'_>,
) -> Result<Vec<Page>, LogicError> {
    let Some(mapping) = logic.generate_slug_mapping(ctx)? else {
        let variables = logic
            .generate_template_variables(ctx, &SlugArgs::default())?
            .unwrap_or_default();
        return Ok(vec![Page { variables, ..base }]);
    };

    let mut pages = Vec::with_capacity(mapping.len());
    for entry in &mapping {
        let variables: Variables = logic
            .generate_template_variables(ctx, &SlugArgs::from(entry))?
            .unwrap_or_default();
        pages.push(Page {
            output_uri: variant_output_uri(&base.output_uri, &entry.slug),
            variables,
            ..base.clone()
        });
    }

    tracing::debug!(
        "Fanned out {} into {} pages",
        base.entrypoint_uri,
        pages.len()
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entrypoint::EntrypointResolver;
    use crate::models::SlugCount;
    use crate::uri::UriTransformer;
    use serde_json::json;

    struct Tags;

    impl PageLogic for Tags {
        fn generate_slug_mapping(
            &self,
            _ctx: &LogicContext<'_>,
        ) -> Result<Option<Vec<SlugCount>>, LogicError> {
            Ok(Some(vec![
                SlugCount { slug: "a".into(), count: 3 },
                SlugCount { slug: "b".into(), count: 1 },
            ]))
        }

        fn generate_template_variables(
            &self,
            _ctx: &LogicContext<'_>,
            args: &SlugArgs,
        ) -> Result<Option<Variables>, LogicError> {
            let mut vars = Variables::new();
            vars.insert("slug".into(), json!(args.slug));
            vars.insert("count".into(), json!(args.count));
            Ok(Some(vars))
        }
    }

    struct Plain;

    impl PageLogic for Plain {
        fn generate_template_variables(
            &self,
            _ctx: &LogicContext<'_>,
            args: &SlugArgs,
        ) -> Result<Option<Variables>, LogicError> {
            assert_eq!(*args, SlugArgs::default());
            let mut vars = Variables::new();
            vars.insert("greeting".into(), json!("hi"));
            Ok(Some(vars))
        }
    }

    fn base() -> Page {
        Page {
            input_uri: "tag/tag.html".into(),
            entrypoint_uri: "tag/tag.html".into(),
            output_uri: "tag/index.html".into(),
            content_class: None,
            variables: Variables::new(),
        }
    }

    fn with_ctx<T>(f: impl FnOnce(&LogicContext<'_>) -> T) -> T {
        let config = Config::default();
        let resolver = EntrypointResolver::new("content");
        let transformer = UriTransformer::from_config(&config);
        let ctx = LogicContext::new(&config, &resolver, &transformer);
        f(&ctx)
    }

    #[test]
    fn test_mapping_yields_one_page_per_slug() {
        let pages = with_ctx(|ctx| expand(base(), &Tags, ctx)).unwrap();
        let uris: Vec<_> = pages.iter().map(|p| p.output_uri.as_str()).collect();
        assert_eq!(uris, vec!["tag/a/index.html", "tag/b/index.html"]);

        assert_eq!(pages[0].variables["slug"], "a");
        assert_eq!(pages[0].variables["count"], 3);
        assert_eq!(pages[1].variables["slug"], "b");
        assert_eq!(pages[1].variables["count"], 1);
        assert!(pages.iter().all(|p| p.entrypoint_uri == "tag/tag.html"));
    }

    #[test]
    fn test_no_mapping_yields_base_page() {
        let pages = with_ctx(|ctx| expand(base(), &Plain, ctx)).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].output_uri, "tag/index.html");
        assert_eq!(pages[0].variables["greeting"], "hi");
    }

    #[test]
    fn test_no_logic_yields_empty_variables() {
        let pages = with_ctx(|ctx| expand(base(), &crate::logic::NoLogic, ctx)).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].variables.is_empty());
    }
}
