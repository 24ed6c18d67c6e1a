use std::sync::Arc;

use overprint_resource::FilesystemResourceProvider;
use overprint_traits::ResourceProvider;

use crate::config::EngineConfig;
use crate::error::OverprintError;
use crate::fonts::{FontFace, FontRegistry};
use crate::layout::{LayoutCache, LayoutConfig};
use crate::merge::{load_template, merge_documents};
use crate::order::{OrderHeader, OrderItem};
use crate::overlay::{OverlayPage, render_overlay, write_overlay};

/// Template id used when the caller passes none, or an empty one.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Long-lived order sheet generator.
///
/// Holds the layout cache and the registered font, so one instance should be
/// shared (it is `Send + Sync`) rather than created per request.
#[derive(Debug)]
pub struct Overprinter {
    config: EngineConfig,
    layouts: Arc<dyn ResourceProvider>,
    templates: Arc<dyn ResourceProvider>,
    fonts: FontRegistry,
    cache: LayoutCache,
}

impl Overprinter {
    /// Reads layouts, templates and fonts from the directories in `config`.
    pub fn new(config: EngineConfig) -> Self {
        let layouts = Arc::new(FilesystemResourceProvider::new(config.layouts_dir()));
        let templates = Arc::new(FilesystemResourceProvider::new(config.templates_dir()));
        let fonts = Arc::new(FilesystemResourceProvider::new(config.fonts_dir()));
        Self::with_providers(config, layouts, templates, fonts)
    }

    /// Uses the given providers instead of the configured directories.
    pub fn with_providers(
        config: EngineConfig,
        layouts: Arc<dyn ResourceProvider>,
        templates: Arc<dyn ResourceProvider>,
        fonts: Arc<dyn ResourceProvider>,
    ) -> Self {
        let fonts = FontRegistry::new(fonts, config.font_file.clone(), config.font_name.clone());
        Self {
            config,
            layouts,
            templates,
            fonts,
            cache: LayoutCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout_cache(&self) -> &LayoutCache {
        &self.cache
    }

    /// Layout for `template_id`, reloaded when its file has changed.
    pub fn load_layout(&self, template_id: &str) -> Result<Arc<LayoutConfig>, OverprintError> {
        self.cache
            .get_or_load(self.layouts.as_ref(), normalize_template_id(template_id))
    }

    /// Registers the font on first use.
    pub fn ensure_font(&self) -> Result<Arc<FontFace>, OverprintError> {
        self.fonts.ensure_font()
    }

    /// Overlay pages for an order, without touching the template.
    pub fn render(
        &self,
        header: &OrderHeader,
        items: &[OrderItem],
        template_id: &str,
    ) -> Result<Vec<OverlayPage>, OverprintError> {
        let layout = self.load_layout(template_id)?;
        let face = self.ensure_font()?;
        Ok(render_overlay(&layout, &face, self.config.page_size, header, items))
    }

    /// Renders an order onto its template and returns the PDF bytes.
    pub fn build(
        &self,
        header: &OrderHeader,
        items: &[OrderItem],
        template_id: &str,
    ) -> Result<Vec<u8>, OverprintError> {
        let layout = self.load_layout(template_id)?;
        if !self.templates.exists(&layout.template_pdf_name) {
            return Err(OverprintError::TemplateNotFound(
                layout.template_pdf_name.clone(),
            ));
        }
        let face = self.ensure_font()?;

        let pages = render_overlay(&layout, &face, self.config.page_size, header, items);
        let overlay = write_overlay(&pages, &face)?;
        let template = load_template(self.templates.as_ref(), &layout.template_pdf_name)?;
        let bytes = merge_documents(&template, &overlay)?;

        log::info!(
            "built order sheet '{}': {} item(s), {} page(s), {} bytes",
            layout.template_id,
            items.len(),
            pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

fn normalize_template_id(template_id: &str) -> &str {
    let trimmed = template_id.trim();
    if trimmed.is_empty() {
        DEFAULT_TEMPLATE_ID
    } else {
        trimmed
    }
}
