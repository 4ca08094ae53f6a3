use leptos::prelude::*;
use tw_merge::*;

/// Inline label wrapping a form control (checkbox, colour picker) in a toolbar.
#[component]
pub fn Label(
    #[prop(optional, into)] class: String,
    #[prop(optional, into)] html_for: String,
    children: Children,
) -> impl IntoView {
    let class = tw_merge!(
        "flex items-center gap-2 text-sm leading-none font-medium select-none cursor-pointer",
        "has-[input:disabled]:cursor-not-allowed has-[input:disabled]:opacity-50",
        class
    );

    view! {
        <label class=class r#for=html_for>
            {children()}
        </label>
    }
}
