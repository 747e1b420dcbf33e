use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::cache::FragmentCache;
use crate::error::RenderError;
use crate::flow::View;
use crate::rendered::{RenderedCollection, RenderedTemplate};
use crate::template::TemplateHandle;

use super::iterator::{CollectionIterator, MixedIterator, PrefetchingIterator, UniformIterator};
use super::path::{partial_path, retrieve_variables, IterationNames};
use super::{PartialIteration, PartialRenderer, Renderable};

/// Renders a collection, one partial per element.
pub struct CollectionRenderer<'a> {
    base: PartialRenderer<'a>,
}

impl<'a> CollectionRenderer<'a> {
    pub fn new(base: PartialRenderer<'a>) -> Self {
        Self { base }
    }

    /// Renders every element through `partial`.
    pub fn render_collection_with_partial(
        &self,
        collection: Vec<Renderable>,
        partial: &str,
        view: &View,
    ) -> Result<RenderedCollection, RenderError> {
        if collection.is_empty() {
            return Ok(self.empty());
        }

        let names = retrieve_variables(partial, self.base.options.as_variable.as_deref())?;
        let keys = self
            .base
            .options
            .local_keys(&[&names.variable, &names.counter, &names.iteration]);
        let iterator = self.wrap(Box::new(UniformIterator::new(collection, names)));

        let template = self.base.find_partial(partial, &keys)?;
        let layout = self.base.find_layout(&keys)?;
        self.render_collection(iterator, view, Some(template), layout)
    }

    /// Renders every element through the partial it names itself.
    ///
    /// When all elements agree on a partial this is a uniform render;
    /// otherwise each element renders through its own partial and fragment
    /// caching is refused.
    pub fn render_collection_derive_partial(
        &self,
        collection: Vec<Renderable>,
        view: &View,
    ) -> Result<RenderedCollection, RenderError> {
        if collection.is_empty() {
            return Ok(self.empty());
        }

        let paths = collection
            .iter()
            .map(|object| partial_path(object, self.base.context, self.base.config))
            .collect::<Result<Vec<_>, _>>()?;

        if paths.iter().all(|path| path == &paths[0]) {
            return self.render_collection_with_partial(collection, &paths[0], view);
        }

        if self.base.options.cached {
            return Err(RenderError::UnsupportedCaching);
        }

        let as_variable = self.base.options.as_variable.as_deref();
        let names = paths
            .iter()
            .map(|path| retrieve_variables(path, as_variable))
            .collect::<Result<Vec<_>, _>>()?;
        let iterator = self.wrap(Box::new(MixedIterator::new(collection, names)));

        let layout = self.base.find_layout(&self.base.options.local_keys(&[]))?;
        self.render_collection(iterator, view, None, layout)
    }

    fn empty(&self) -> RenderedCollection {
        RenderedCollection::empty(self.base.context.formats().first().cloned())
    }

    fn wrap(&self, iterator: Box<dyn CollectionIterator>) -> Box<dyn CollectionIterator> {
        match &self.base.options.preloader {
            Some(preloader) => Box::new(PrefetchingIterator::new(iterator, preloader.clone())),
            None => iterator,
        }
    }

    fn render_collection(
        &self,
        mut iterator: Box<dyn CollectionIterator>,
        view: &View,
        template: Option<TemplateHandle>,
        layout: Option<TemplateHandle>,
    ) -> Result<RenderedCollection, RenderError> {
        let options = self.base.options;

        let spacer = match options.spacer_template.as_deref() {
            Some(spacer) => {
                let spacer = self.base.find_partial(spacer, &options.local_keys(&[]))?;
                Some(spacer.render_to_string(view, &options.locals)?)
            }
            None => None,
        };

        let entries = match &template {
            Some(template) => {
                self.cache_collection_render(iterator, view, template, layout.as_ref())?
            }
            None => self.collection_with_template(iterator.as_mut(), view, None, layout.as_ref())?,
        };

        debug!(
            identifier = template.as_ref().map(|t| t.identifier()).unwrap_or("mixed"),
            count = entries.len(),
            "rendered collection"
        );
        Ok(RenderedCollection::new(entries, spacer))
    }

    /// Renders each element, binding it with its counter and iteration.
    ///
    /// Without a uniform `template`, each distinct partial path is looked up
    /// once on first use.
    fn collection_with_template(
        &self,
        iterator: &mut dyn CollectionIterator,
        view: &View,
        template: Option<&TemplateHandle>,
        layout: Option<&TemplateHandle>,
    ) -> Result<Vec<RenderedTemplate>, RenderError> {
        let options = self.base.options;
        let mut locals = options.locals.clone();
        let mut templates: HashMap<String, TemplateHandle> = HashMap::new();
        let mut iteration = PartialIteration::new(iterator.len());
        let mut rendered = Vec::with_capacity(iterator.len());

        iterator.each_with_info(&mut |object: &Renderable, names: &IterationNames| {
            locals.insert(names.variable.clone(), object.value().clone());
            locals.insert(names.counter.clone(), iteration.index().into());
            locals.insert(names.iteration.clone(), serde_json::to_value(iteration)?);

            let template = match template {
                Some(template) => template.clone(),
                None => match templates.get(&names.path) {
                    Some(template) => template.clone(),
                    None => {
                        let keys = options.local_keys(&[
                            &names.variable,
                            &names.counter,
                            &names.iteration,
                        ]);
                        let template = self.base.find_partial(&names.path, &keys)?;
                        templates.insert(names.path.clone(), template.clone());
                        template
                    }
                },
            };

            rendered.push(
                self.base
                    .render_partial_template(view, &template, layout, &locals)?,
            );
            iteration.iterate();
            Ok(())
        })?;

        Ok(rendered)
    }

    fn will_cache(&self) -> Option<&'a dyn FragmentCache> {
        if !self.base.options.cached {
            return None;
        }
        if !self.base.config.perform_caching {
            warn!("collection caching requested but perform_caching is disabled");
            return None;
        }
        if self.base.cache.is_none() {
            warn!("collection caching requested but no fragment cache is configured");
        }
        self.base.cache
    }

    /// Serves cached elements from the fragment cache and renders the rest.
    ///
    /// Keys are read in one batch. Misses render as their own collection, the
    /// only walk that preloads, and are written back. The result keeps the
    /// original element order.
    fn cache_collection_render(
        &self,
        mut iterator: Box<dyn CollectionIterator>,
        view: &View,
        template: &TemplateHandle,
        layout: Option<&TemplateHandle>,
    ) -> Result<Vec<RenderedTemplate>, RenderError> {
        let Some(cache) = self.will_cache() else {
            return self.collection_with_template(iterator.as_mut(), view, Some(template), layout);
        };

        let config = self.base.config;
        let mut ordered_keys = Vec::with_capacity(iterator.len());
        let mut keyed: Vec<(String, Renderable)> = Vec::new();
        let mut seen = HashSet::new();
        // Keys come straight from the elements so a prefetching iterator only
        // preloads the misses.
        for object in iterator.collection() {
            let key = config.namespaced_cache_key(&object.cache_key());
            if seen.insert(key.clone()) {
                keyed.push((key.clone(), object.clone()));
            }
            ordered_keys.push(key);
        }

        let unique_keys: Vec<String> = keyed.iter().map(|(key, _)| key.clone()).collect();
        let cached = cache.read_multi(&unique_keys);
        debug!(
            identifier = template.identifier(),
            cache_hits = cached.len(),
            count = ordered_keys.len(),
            "read collection fragments"
        );

        let (miss_keys, misses): (Vec<String>, Vec<Renderable>) = keyed
            .into_iter()
            .filter(|(key, _)| !cached.contains_key(key))
            .unzip();

        let rendered_misses = if misses.is_empty() {
            Vec::new()
        } else {
            let mut subset = iterator.from_collection(misses);
            self.collection_with_template(subset.as_mut(), view, Some(template), layout)?
        };

        let mut by_key: HashMap<String, RenderedTemplate> = HashMap::new();
        for (key, rendered) in miss_keys.into_iter().zip(rendered_misses) {
            cache.write(&key, rendered.body());
            by_key.insert(key, rendered);
        }
        for (key, body) in cached {
            by_key.insert(key, RenderedTemplate::new(body, template.clone()));
        }

        Ok(ordered_keys
            .iter()
            .filter_map(|key| by_key.get(key).cloned())
            .collect())
    }
}
