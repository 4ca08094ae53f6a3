use crate::pages::{EditorPage, PreviewPage};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    // Leptos CSR requires the `csr` feature on `leptos`; router hooks require a <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Page introuvable"</div> }>
                <Route path=path!("preview") view=PreviewPage />
                <Route path=path!("") view=EditorPage />
            </Routes>
        </Router>
    }
}
