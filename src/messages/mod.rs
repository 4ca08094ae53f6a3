//! User-facing strings (French).

pub(crate) const CONFIRM_DELETE_IMAGE: &str = "Supprimer cette image ?";
pub(crate) const CONFIRM_DELETE_ROW: &str = "Supprimer cette ligne du tableau ?";
pub(crate) const CONFIRM_DELETE_COLUMN: &str = "Supprimer cette colonne du tableau ?";
pub(crate) const CONFIRM_DELETE_SECTION: &str = "Supprimer cette section ?";
pub(crate) const CONFIRM_DELETE_VIDEO: &str = "Supprimer cette vidéo ?";
pub(crate) const CONFIRM_DELETE_GALLERY_IMAGE: &str = "Retirer cette image de la galerie ?";
pub(crate) const CONFIRM_CLEAR_ALL: &str =
    "Effacer tout le contenu de la newsletter ? Cette action peut être annulée.";
pub(crate) const CONFIRM_RESET_IMAGE: &str = "Revenir à l'image d'origine ?";
pub(crate) const CONFIRM_RESTORE_SNAPSHOT: &str =
    "Restaurer cette version ? Le contenu actuel sera remplacé.";
pub(crate) const CONFIRM_DELETE_SNAPSHOTS: &str = "Supprimer les versions sélectionnées ?";
pub(crate) const CONFIRM_CLEAR_SNAPSHOTS: &str = "Supprimer tout l'historique des sauvegardes ?";
pub(crate) const CONFIRM_IMPORT: &str = "Remplacer le contenu actuel par le fichier importé ?";

pub(crate) const PROMPT_TABLE_ROWS: &str = "Nombre de lignes :";
pub(crate) const PROMPT_TABLE_COLUMNS: &str = "Nombre de colonnes :";
pub(crate) const PROMPT_VIDEO_URL: &str = "URL de la vidéo (YouTube, Vimeo ou fichier) :";
pub(crate) const PROMPT_SNAPSHOT_NAME: &str = "Nom de la version :";

pub(crate) const ALERT_LAST_ROW: &str = "Impossible de supprimer la dernière ligne du tableau.";
pub(crate) const ALERT_LAST_COLUMN: &str =
    "Impossible de supprimer la dernière colonne du tableau.";
pub(crate) const ALERT_INVALID_CROP: &str =
    "Zone de recadrage invalide : sélectionnez une zone non vide.";
pub(crate) const ALERT_IMAGE_PROCESSING: &str = "Le traitement de l'image a échoué.";
pub(crate) const ALERT_SAVE_FAILED: &str = "L'enregistrement du fichier a échoué.";
pub(crate) const ALERT_SNAPSHOT_NOT_STORED: &str =
    "La version n'a pas pu être conservée : le stockage du navigateur est plein.";
pub(crate) const ALERT_IMPORT_FAILED: &str = "Ce fichier ne contient pas de newsletter lisible.";

pub(crate) const ACTION_MANUAL_SAVE: &str = "Sauvegarde manuelle";
pub(crate) const ACTION_SNAPSHOT: &str = "Instantané";
pub(crate) const ACTION_AUTOSAVE: &str = "Sauvegarde automatique";

pub(crate) const UNTITLED: &str = "Newsletter sans titre";
pub(crate) const CAPTION_PLACEHOLDER: &str = "Légende...";
pub(crate) const VIDEO_FALLBACK: &str = "Votre navigateur ne peut pas lire cette vidéo.";
pub(crate) const REMOVED_MEDIA: &str = "[média retiré]";
