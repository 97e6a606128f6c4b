use crate::web::templates::escape_html;

/// CSS for the single-file drop zone.
pub const UPLOAD_WIDGET_STYLES: &str = r#"
.tfc-upload { display: flex; flex-direction: column; gap: 0.6rem; }
.tfc-upload__label { font-weight: 600; }
.tfc-dropzone { border: 2px dashed var(--border); border-radius: 12px; padding: 2rem; text-align: center; background: var(--soft); color: var(--muted); transition: border-color 0.2s ease, background 0.2s ease; cursor: pointer; }
.tfc-dropzone strong { color: var(--primary); }
.tfc-dropzone[data-state="dragover"] { border-color: var(--primary); }
.tfc-upload-note { font-size: 0.9rem; margin: 0.5rem 0 0; }
.tfc-upload-input { display: none; }
.tfc-upload-status { min-height: 1.4rem; font-size: 0.95rem; color: var(--primary); }
.tfc-upload-status[data-state="error"] { color: #dc2626; }
@media (max-width: 768px) {
    .tfc-dropzone { padding: 1.5rem 1rem; }
}
"#;

/// Vanilla script: drag and drop plus the size and extension checks before the form is sent.
pub const UPLOAD_WIDGET_SCRIPT: &str = r#"<script>
(function() {
    function initWidget(widget) {
        if (widget.dataset.initialized === 'true') {
            return;
        }
        widget.dataset.initialized = 'true';

        const input = widget.querySelector('input[type="file"]');
        const dropzone = widget.querySelector('[data-dropzone]');
        const statusBox = widget.querySelector('[data-upload-status]');
        const maxBytes = parseInt(widget.dataset.maxBytes || '0', 10);
        const allowed = (widget.dataset.extensions || '').split(',').filter(Boolean);

        if (!input || !dropzone) {
            return;
        }

        function report(message, isError) {
            if (!statusBox) {
                return;
            }
            statusBox.textContent = message;
            if (isError) {
                statusBox.dataset.state = 'error';
            } else {
                delete statusBox.dataset.state;
            }
        }

        function problemWith(file) {
            const ext = (file.name.split('.').pop() || '').toLowerCase();
            if (allowed.length > 0 && (!file.name.includes('.') || !allowed.includes(ext))) {
                return widget.dataset.typeMessage;
            }
            if (maxBytes > 0 && file.size > maxBytes) {
                return widget.dataset.sizeMessage;
            }
            return null;
        }

        function accept(file) {
            const problem = problemWith(file);
            if (problem) {
                input.value = '';
                report(problem, true);
                return;
            }
            const dt = new DataTransfer();
            dt.items.add(file);
            input.files = dt.files;
            const sizeMb = (file.size / (1024 * 1024)).toFixed(2);
            report(`${file.name} (${sizeMb} MB)`, false);
        }

        input.addEventListener('change', () => {
            if (input.files.length > 0) {
                accept(input.files[0]);
            } else {
                report('', false);
            }
        });

        const activateDrag = () => dropzone.dataset.state = 'dragover';
        const deactivateDrag = () => delete dropzone.dataset.state;

        dropzone.addEventListener('click', () => input.click());
        dropzone.addEventListener('dragenter', (event) => {
            event.preventDefault();
            activateDrag();
        });
        dropzone.addEventListener('dragover', (event) => {
            event.preventDefault();
        });
        dropzone.addEventListener('dragleave', (event) => {
            event.preventDefault();
            if (!dropzone.contains(event.relatedTarget)) {
                deactivateDrag();
            }
        });
        dropzone.addEventListener('drop', (event) => {
            event.preventDefault();
            deactivateDrag();
            if (event.dataTransfer.files.length > 0) {
                accept(event.dataTransfer.files[0]);
            }
        });

        const form = widget.closest('form');
        if (form) {
            form.addEventListener('submit', (event) => {
                if (input.files.length === 0) {
                    event.preventDefault();
                    report(widget.dataset.requiredMessage, true);
                }
            });
        }
    }

    if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', () => {
            document.querySelectorAll('.tfc-upload').forEach(initWidget);
        });
    } else {
        document.querySelectorAll('.tfc-upload').forEach(initWidget);
    }
})();
</script>"#;

#[derive(Debug, Clone)]
pub struct UploadWidgetConfig<'a> {
    pub widget_id: &'a str,
    pub input_id: &'a str,
    pub field_name: &'a str,
    pub label: &'a str,
    pub note: Option<&'a str>,
    pub extensions: &'a [&'a str],
    pub max_bytes: u64,
    pub size_message: String,
    pub type_message: String,
    pub required_message: &'a str,
}

pub fn render_upload_widget(config: &UploadWidgetConfig<'_>) -> String {
    let note = config
        .note
        .map(|text| format!("<p class=\"tfc-upload-note\">{}</p>", escape_html(text)))
        .unwrap_or_default();

    let accept = config
        .extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<div class="tfc-upload" id="{id}" data-max-bytes="{max_bytes}" data-extensions="{extensions}" data-size-message="{size_message}" data-type-message="{type_message}" data-required-message="{required_message}">
    <label class="tfc-upload__label" for="{input_id}">{label}</label>
    <div class="tfc-dropzone" data-dropzone>
        <p><strong>Arraste o ficheiro</strong> para aqui ou clique para selecionar</p>
        {note}
        <input class="tfc-upload-input" id="{input_id}" name="{field_name}" type="file" accept="{accept}">
    </div>
    <div class="tfc-upload-status" data-upload-status></div>
</div>"#,
        id = escape_html(config.widget_id),
        max_bytes = config.max_bytes,
        extensions = escape_html(&config.extensions.join(",")),
        size_message = escape_html(&config.size_message),
        type_message = escape_html(&config.type_message),
        required_message = escape_html(config.required_message),
        input_id = escape_html(config.input_id),
        label = escape_html(config.label),
        note = note,
        field_name = escape_html(config.field_name),
        accept = escape_html(&accept),
    )
}
