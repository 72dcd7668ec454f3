use crate::commands::{require_admin, Actor, CmdMessage, CmdResult};
use crate::error::{KennelError, Result};
use crate::model::{AssetRef, Item, ItemId, ItemPatch, LifecycleStatus, NewItem};
use crate::prompt::Prompter;
use crate::repository::Repository;
use crate::store::transport::Transport;
use chrono::Utc;

/// A picture picked by the user, not yet stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Listing restores a wiped working copy first, so an empty list is never
/// shown while a backup still has the catalogue.
pub fn list<T: Transport>(repo: &mut Repository<T>, status: Option<LifecycleStatus>) -> CmdResult {
    let mut result = CmdResult::default();
    restore_warning(repo, &mut result);

    let items: Vec<Item> = match status {
        Some(status) => repo.items_by_status(status).into_iter().cloned().collect(),
        None => repo.items().to_vec(),
    };
    if items.is_empty() {
        result.add_message(CmdMessage::info(match status {
            Some(status) => format!("No {status} items."),
            None => "The catalogue is empty.".to_string(),
        }));
    }
    result.with_listed_items(items)
}

pub fn view<T: Transport>(repo: &Repository<T>, ids: &[ItemId]) -> Result<CmdResult> {
    let items = ids
        .iter()
        .map(|id| {
            repo.find_item(*id)
                .cloned()
                .ok_or(KennelError::RecordNotFound(*id))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CmdResult::default().with_listed_items(items))
}

/// Store pictures first so a failed upload leaves the catalogue untouched.
fn upload_photos<T: Transport>(
    repo: &Repository<T>,
    photos: &[PhotoUpload],
) -> Result<Vec<AssetRef>> {
    let stamp = Utc::now().timestamp_millis();
    photos
        .iter()
        .enumerate()
        .map(|(i, photo)| {
            let name = format!("{stamp}_{i}_{}", sanitize_file_name(&photo.file_name));
            repo.facade()
                .upload_asset(&photo.bytes, &name, &photo.mime)
        })
        .collect()
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn restore_warning<T: Transport>(repo: &mut Repository<T>, result: &mut CmdResult) {
    if let Some(source) = repo.ensure_not_empty() {
        result.add_message(CmdMessage::warning(format!(
            "The catalogue was empty; restored {} items from the {source}",
            repo.items().len()
        )));
    }
}

pub fn add<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    mut new: NewItem,
    photos: &[PhotoUpload],
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    if new.name.trim().is_empty() {
        return Err(KennelError::Validation("a name is required".to_string()));
    }
    let mut result = CmdResult::default();
    restore_warning(repo, &mut result);

    new.media.extend(upload_photos(repo, photos)?);
    let id = repo.add_item(new)?;
    let outcome = repo.save(prompter)?;

    let added = repo.find_item(id).cloned().into_iter().collect();
    result.add_message(CmdMessage::success(format!("Added item {id}")));
    Ok(result.with_affected_items(added).with_save(outcome))
}

pub fn edit<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    id: ItemId,
    mut patch: ItemPatch,
    photos: &[PhotoUpload],
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let mut result = CmdResult::default();
    restore_warning(repo, &mut result);

    let current = repo
        .find_item(id)
        .ok_or(KennelError::RecordNotFound(id))?;
    if !photos.is_empty() {
        let mut media = patch.media.take().unwrap_or_else(|| current.media.clone());
        media.extend(upload_photos(repo, photos)?);
        patch.media = Some(media);
    }
    if patch.is_empty() {
        result.add_message(CmdMessage::info(format!("Nothing to change on item {id}")));
        return Ok(result);
    }

    repo.update_item(id, patch)?;
    let outcome = repo.save(prompter)?;
    let updated = repo.find_item(id).cloned().into_iter().collect();
    result.add_message(CmdMessage::success(format!("Updated item {id}")));
    Ok(result.with_affected_items(updated).with_save(outcome))
}

pub fn delete<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    ids: &[ItemId],
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let mut result = CmdResult::default();
    restore_warning(repo, &mut result);

    // all or nothing
    if let Some(missing) = ids.iter().find(|id| repo.find_item(**id).is_none()) {
        return Err(KennelError::RecordNotFound(*missing));
    }
    let question = format!("Delete {} item(s)?", ids.len());
    if !prompter.confirm(&question) {
        result.add_message(CmdMessage::info("Nothing deleted"));
        return Ok(result);
    }

    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        removed.push(repo.delete_item(*id)?);
    }
    let outcome = repo.save(prompter)?;
    result.add_message(CmdMessage::success(format!(
        "Deleted {} item(s)",
        removed.len()
    )));
    Ok(result.with_affected_items(removed).with_save(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{admin, fixture, guest};
    use crate::prompt::FixedPrompter;
    use crate::store::facade::SaveOutcome;

    fn rex() -> NewItem {
        NewItem {
            name: "Rex".to_string(),
            breed: "Husky".to_string(),
            status: LifecycleStatus::Puppy,
            ..Default::default()
        }
    }

    #[test]
    fn add_publishes_with_inline_photos() {
        let mut f = fixture();
        let photo = PhotoUpload {
            file_name: "rex 1.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
        };
        let result = add(&mut f.repo, Some(&admin()), rex(), &[photo], &FixedPrompter::yes()).unwrap();

        assert_eq!(result.save_outcome, Some(SaveOutcome::Committed));
        let item = &result.affected_items[0];
        assert!(item.media[0].starts_with("data:image/jpeg;base64,"));
        assert_eq!(f.api.document("data.json").unwrap().items, vec![item.clone()]);
    }

    #[test]
    fn guests_cannot_edit() {
        let mut f = fixture();
        assert!(matches!(
            add(&mut f.repo, Some(&guest()), rex(), &[], &FixedPrompter::yes()),
            Err(KennelError::PermissionDenied(_))
        ));
        assert!(matches!(
            add(&mut f.repo, None, rex(), &[], &FixedPrompter::yes()),
            Err(KennelError::PermissionDenied(_))
        ));
    }

    #[test]
    fn invalid_photo_leaves_catalogue_untouched() {
        let mut f = fixture();
        let photo = PhotoUpload {
            file_name: "notes.txt".to_string(),
            mime: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        };
        assert!(matches!(
            add(&mut f.repo, Some(&admin()), rex(), &[photo], &FixedPrompter::yes()),
            Err(KennelError::InvalidAsset(_))
        ));
        assert!(f.repo.items().is_empty());
    }

    #[test]
    fn edit_merges_and_appends_photos() {
        let mut f = fixture();
        let added = add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap();
        let id = added.affected_items[0].id;

        let patch = ItemPatch {
            status: Some(LifecycleStatus::Graduate),
            ..Default::default()
        };
        let photo = PhotoUpload {
            file_name: "a.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = edit(&mut f.repo, Some(&admin()), id, patch, &[photo], &FixedPrompter::yes()).unwrap();
        let item = &result.affected_items[0];
        assert_eq!(item.status, LifecycleStatus::Graduate);
        assert_eq!(item.breed, "Husky");
        assert_eq!(item.media.len(), 1);
    }

    #[test]
    fn edit_unknown_item_fails() {
        let mut f = fixture();
        add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap();
        assert!(matches!(
            edit(&mut f.repo, Some(&admin()), ItemId(1), ItemPatch::default(), &[], &FixedPrompter::yes()),
            Err(KennelError::RecordNotFound(_))
        ));
    }

    #[test]
    fn delete_is_confirmed_and_all_or_nothing() {
        let mut f = fixture();
        let a = add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap().affected_items[0].id;
        let b = add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap().affected_items[0].id;

        assert!(delete(&mut f.repo, Some(&admin()), &[a, ItemId(3)], &FixedPrompter::yes()).is_err());
        assert_eq!(f.repo.items().len(), 2);

        let declined = delete(&mut f.repo, Some(&admin()), &[a], &FixedPrompter::no()).unwrap();
        assert!(declined.affected_items.is_empty());
        assert_eq!(f.repo.items().len(), 2);

        let result = delete(&mut f.repo, Some(&admin()), &[a], &FixedPrompter::yes()).unwrap();
        assert_eq!(result.affected_items.len(), 1);
        assert_eq!(f.api.document("data.json").unwrap().items[0].id, b);
    }

    #[test]
    fn list_filters_by_status() {
        let mut f = fixture();
        add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap();
        assert_eq!(list(&mut f.repo, Some(LifecycleStatus::Puppy)).listed_items.len(), 1);
        let none = list(&mut f.repo, Some(LifecycleStatus::Memorial));
        assert!(none.listed_items.is_empty());
        assert_eq!(none.messages[0].content, "No memorial items.");
    }

    #[test]
    fn view_reports_missing_ids() {
        let f = fixture();
        assert!(matches!(
            view(&f.repo, &[ItemId(77)]),
            Err(KennelError::RecordNotFound(ItemId(77)))
        ));
    }

    #[test]
    fn list_restores_a_wiped_working_copy() {
        let mut f = fixture();
        add(&mut f.repo, Some(&admin()), rex(), &[], &FixedPrompter::yes()).unwrap();
        let mut wiped = f.repo.document().clone();
        wiped.items.clear();
        f.repo.replace(wiped);

        let result = list(&mut f.repo, None);
        assert_eq!(result.listed_items.len(), 1);
        assert!(result
            .messages
            .iter()
            .any(|m| m.level == crate::commands::MessageLevel::Warning
                && m.content.contains("restored 1 items")));
    }
}
