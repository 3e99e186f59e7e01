//! Client-side state that lives independently of any view: the filtered
//! record list of the admin dashboard and the dynamic sections of the census
//! form.

pub mod record_filter;
pub mod section_templates;
pub mod sections;

pub use record_filter::{FilterCriteria, RecordFilterEngine};
pub use section_templates::{FieldSpec, FieldType, SectionKind, SectionTemplate};
pub use sections::{
    Clock, DynamicSectionManager, FieldState, Section, SectionId, SerializedSections,
};
