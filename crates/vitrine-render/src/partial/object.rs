use crate::error::RenderError;
use crate::flow::View;
use crate::rendered::RenderedTemplate;

use super::path::{local_variable, partial_path};
use super::{PartialRenderer, Renderable};

/// Renders one object through a partial.
pub struct ObjectRenderer<'a> {
    base: PartialRenderer<'a>,
}

impl<'a> ObjectRenderer<'a> {
    pub fn new(base: PartialRenderer<'a>) -> Self {
        Self { base }
    }

    /// Renders `object` through `partial`, bound to the partial's local name
    /// (or the `as` override).
    pub fn render_object_with_partial(
        &self,
        object: &Renderable,
        partial: &str,
        view: &View,
    ) -> Result<RenderedTemplate, RenderError> {
        let options = self.base.options;
        let variable = local_variable(partial, options.as_variable.as_deref())?;
        let keys = options.local_keys(&[&variable]);

        let template = self.base.find_partial(partial, &keys)?;
        let layout = self.base.find_layout(&keys)?;

        let mut locals = options.locals.clone();
        locals.insert(variable, object.value().clone());
        self.base
            .render_partial_template(view, &template, layout.as_ref(), &locals)
    }

    /// Renders `object` through the partial it names itself.
    pub fn render_object_derive_partial(
        &self,
        object: &Renderable,
        view: &View,
    ) -> Result<RenderedTemplate, RenderError> {
        let path = partial_path(object, self.base.context, self.base.config)?;
        self.render_object_with_partial(object, &path, view)
    }
}
