use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader, CardTitle,
};
use crate::dom::{self, WebPrompter};
use crate::editor::{EditorContext, NewsletterEditor};
use crate::preview::PreviewMessage;
use crate::snapshots::SnapshotRecord;
use leptos::ev;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;

#[component]
pub fn EditorPage() -> impl IntoView {
    let ctx = EditorContext::new();
    provide_context(ctx);

    let history_open: RwSignal<bool> = RwSignal::new(false);

    view! {
        <div class="min-h-screen bg-muted/30 text-foreground">
            <div class="mx-auto flex max-w-6xl gap-4 px-4 py-6">
                <main class="min-w-0 flex-1">
                    <NewsletterEditor history_open=history_open />
                </main>
                <Show when=move || history_open.get()>
                    <aside class="w-80 shrink-0">
                        <HistoryPanel />
                    </aside>
                </Show>
            </div>
        </div>
    }
}

/// Saved versions: restore one, delete a selection or wipe the list.
#[component]
fn HistoryPanel() -> impl IntoView {
    let ctx = expect_context::<EditorContext>();
    let selected: RwSignal<Vec<String>> = RwSignal::new(vec![]);

    // Older records were named from raw markup; rename them once per opening.
    let migrated = ctx.session.with_value(|s| s.migrate_titles());
    if migrated > 0 {
        log::info!("renamed {migrated} snapshots");
    }
    ctx.reload_snapshots();

    let toggle = move |id: String, on: bool| {
        selected.update(|ids| {
            ids.retain(|x| *x != id);
            if on {
                ids.push(id);
            }
        });
    };

    let on_delete_selected = move |_| {
        let ids = selected.get_untracked();
        let removed = ctx
            .session
            .with_value(|s| s.delete_snapshots(&ids, &WebPrompter));
        if removed > 0 {
            selected.set(vec![]);
            ctx.reload_snapshots();
        }
    };

    let on_clear = move |_| {
        if ctx.session.with_value(|s| s.clear_snapshots(&WebPrompter)) {
            selected.set(vec![]);
            ctx.reload_snapshots();
        }
    };

    view! {
        <Card class="sticky top-4 gap-3 py-4">
            <CardHeader class="px-4">
                <CardTitle class="text-sm">"Historique"</CardTitle>
                <CardDescription class="text-xs">
                    {move || format!("{} version(s) enregistrée(s)", ctx.snapshots.get().len())}
                </CardDescription>
            </CardHeader>
            <CardContent class="flex max-h-[70vh] flex-col gap-2 overflow-y-auto px-4">
                <Show
                    when=move || !ctx.snapshots.get().is_empty()
                    fallback=|| view! { <div class="text-xs text-muted-foreground">"Aucune version."</div> }
                >
                    <For
                        each=move || ctx.snapshots.get()
                        key=|r: &SnapshotRecord| (r.id.clone(), r.name.clone())
                        children=move |r: SnapshotRecord| {
                            let id = r.id.clone();
                            let id_for_toggle = r.id.clone();
                            let id_for_checked = r.id.clone();
                            view! {
                                <div class="rounded-md border bg-background p-2 text-xs">
                                    <div class="flex items-start gap-2">
                                        <input
                                            type="checkbox"
                                            class="mt-0.5"
                                            prop:checked=move || selected.get().contains(&id_for_checked)
                                            on:change=move |ev| toggle(id_for_toggle.clone(), event_target_checked(&ev))
                                        />
                                        <div class="min-w-0 flex-1">
                                            <div class="truncate font-medium">{r.name.clone()}</div>
                                            <div class="text-muted-foreground">
                                                {format!("{} · {}", r.date, r.last_action)}
                                            </div>
                                            <div class="line-clamp-2 text-muted-foreground">{r.preview.clone()}</div>
                                        </div>
                                    </div>
                                    <Button
                                        variant=ButtonVariant::Outline
                                        size=ButtonSize::Sm
                                        class="mt-2 w-full"
                                        on:click=move |_| ctx.restore(&id)
                                    >
                                        "Restaurer"
                                    </Button>
                                </div>
                            }
                        }
                    />
                </Show>
                <div class="flex gap-2 pt-2">
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        attr:disabled=move || selected.get().is_empty()
                        on:click=on_delete_selected
                    >
                        "Supprimer la sélection"
                    </Button>
                    <Button variant=ButtonVariant::Destructive size=ButtonSize::Sm on:click=on_clear>
                        "Tout supprimer"
                    </Button>
                </div>
            </CardContent>
        </Card>
    }
}

/// Read-only rendering of the newsletter, fed by the editing window.
#[component]
pub fn PreviewPage() -> impl IntoView {
    let message: RwSignal<Option<PreviewMessage>> = RwSignal::new(None);

    let handle = window_event_listener(ev::message, move |ev: web_sys::MessageEvent| {
        let Some(m) = dom::preview_from_event(&ev) else {
            return;
        };
        document().set_title(&m.title);
        message.set(Some(m));
    });
    on_cleanup(move || handle.remove());

    view! {
        <div class="min-h-screen bg-muted/30 px-4 py-8">
            <Show
                when=move || message.with(|m| m.is_some())
                fallback=|| view! {
                    <div class="text-center text-xs text-muted-foreground">"En attente du contenu…"</div>
                }
            >
                <article class="newsletter-preview mx-auto max-w-3xl rounded-md bg-white p-8 shadow-sm">
                    <header class="mb-6 border-b pb-4">
                        <h1 class="text-2xl font-semibold">
                            {move || message.with(|m| m.as_ref().map(|m| m.title.clone()).unwrap_or_default())}
                        </h1>
                        <div class="text-xs text-muted-foreground">
                            {move || message.with(|m| m.as_ref().map(|m| m.date.clone()).unwrap_or_default())}
                        </div>
                    </header>
                    <div inner_html=move || {
                        message.with(|m| m.as_ref().map(|m| m.content.clone()).unwrap_or_default())
                    }></div>
                </article>
            </Show>
        </div>
    }
}
