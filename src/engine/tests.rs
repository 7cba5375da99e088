//! Engine scenarios, each run once per storage backend.

use super::*;
use crate::error::ErrorKind;
use crate::state::data::NodeKind;

fn cat<S: CatalogStore>(catalog: &mut Catalog<S>, name: &str, parent: Location) -> CategoryId {
    catalog.create_category(name, &parent).unwrap()
}

fn path(p: &str) -> Location {
    Location::Path(p.to_string())
}

fn image(n: usize) -> ImageRef {
    ImageRef {
        thumb: format!("thumbs/{}.jpg", n),
        full: format!("full/{}.jpg", n),
        handle: None,
    }
}

fn test_create_and_resolve<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let electronics = cat(catalog, "Electronics", Location::Root);
    let cables = cat(catalog, "Cables", path("/Electronics"));
    let usb = cat(catalog, "USB", Location::Id(cables));

    assert_eq!(catalog.resolve_path("/").unwrap(), None);
    assert_eq!(catalog.resolve_path("/Electronics").unwrap(), Some(electronics));
    assert_eq!(catalog.resolve_path("/electronics/CABLES/usb").unwrap(), Some(usb));
    assert_eq!(
        catalog.breadcrumb_path(Some(usb)).unwrap(),
        "/Electronics/Cables/USB"
    );
    assert_eq!(catalog.breadcrumb_path(None).unwrap(), "/");
}

fn test_round_trip<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "Power Tools", Location::Root);
    let b = cat(catalog, "Drills, cordless", Location::Id(a));
    cat(catalog, "Bits_2.5mm", Location::Id(b));

    for p in ["/Power Tools", "/Power Tools/Drills, cordless", "/Power Tools/Drills, cordless/Bits_2.5mm"] {
        let id = catalog.resolve_path(p).unwrap();
        assert_eq!(catalog.breadcrumb_path(id).unwrap(), p);
    }
}

fn test_invalid_names_are_rejected<S: CatalogStore>(catalog: &mut Catalog<S>) {
    for name in ["", "   ", "a/b", "café", "..", "semi;colon"] {
        let err = catalog.create_category(name, &Location::Root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName, "name {:?}", name);
    }
    let err = catalog.create_item("<script>", &Location::Root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidName);

    // Surrounding whitespace is trimmed, not rejected
    let id = cat(catalog, "  Spares  ", Location::Root);
    assert_eq!(catalog.resolve_path("/Spares").unwrap(), Some(id));
    assert!(catalog.snapshot().unwrap().categories().len() == 1);
}

fn test_duplicate_siblings<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let shelf = cat(catalog, "Shelf", Location::Root);
    cat(catalog, "Bin", Location::Id(shelf));

    let err = catalog.create_category("BIN", &Location::Id(shelf)).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName { ref parent, .. } if parent == "/Shelf"));

    // Same name under another parent is fine
    cat(catalog, "Bin", Location::Root);

    // Widget twice under the same category
    catalog.create_item("Widget", &Location::Id(shelf)).unwrap();
    let err = catalog.create_item("widget", &Location::Id(shelf)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    let listing = catalog.list(&Location::Id(shelf)).unwrap();
    assert_eq!(listing.items.len(), 1);

    // Items and categories do not clash with each other
    catalog.create_item("Bin", &Location::Id(shelf)).unwrap();
}

fn test_missing_parents<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let err = catalog.create_category("A", &Location::Id(404)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = catalog.create_item("A", &path("/Nowhere")).unwrap_err();
    assert!(matches!(err, CatalogError::PathNotFound { ref path } if path == "/Nowhere"));

    let err = catalog.create_item("A", &path("Nowhere")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
}

fn test_new_item_defaults<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let before = Utc::now().timestamp();
    let uid = catalog.create_item("Widget", &Location::Root).unwrap();

    assert_eq!(uid.len(), UID_LEN);
    assert!(uid.chars().all(|c| c.is_ascii_digit()));

    let item = catalog.get_item(&uid).unwrap();
    assert_eq!(item.count, 0);
    assert!(item.images.is_empty());
    assert_eq!(item.category_id, None);
    assert!(item.timestamp >= before);
}

fn test_move_scenario<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let electronics = cat(catalog, "Electronics", Location::Root);
    let cables = cat(catalog, "Cables", Location::Id(electronics));
    let uid = catalog.create_item("USB-C", &Location::Id(cables)).unwrap();
    assert_eq!(catalog.get_item(&uid).unwrap().count, 0);

    let outcome = catalog.move_node(&NodeRef::Category(cables), "/").unwrap();
    assert_eq!(outcome, MoveOutcome::Moved);

    assert_eq!(catalog.resolve_path("/Cables").unwrap(), Some(cables));
    let err = catalog.resolve_path("/Electronics/Cables").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathNotFound);

    // The item travelled with its category
    assert_eq!(catalog.get_path(&NodeRef::Item(uid)).unwrap(), "/Cables");
}

fn test_move_into_own_subtree_fails<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let b = cat(catalog, "B", Location::Id(a));
    cat(catalog, "C", Location::Id(b));
    let before = catalog.export().unwrap().categories;

    for dest in ["/A", "/A/B", "/A/B/C", "/a/b/./c/"] {
        let err = catalog.move_node(&NodeRef::Category(a), dest).unwrap_err();
        assert!(matches!(err, CatalogError::Cycle), "dest {}", dest);
    }
    let err = catalog.move_node(&NodeRef::Category(b), "/A/B/C").unwrap_err();
    assert!(matches!(err, CatalogError::Cycle));

    assert_eq!(catalog.export().unwrap().categories, before);
}

fn test_move_to_current_place_is_noop<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let b = cat(catalog, "B", Location::Id(a));
    let uid = catalog.create_item("Thing", &Location::Id(b)).unwrap();
    let root_uid = catalog.create_item("Loose", &Location::Root).unwrap();
    let before = catalog.export().unwrap();

    assert_eq!(
        catalog.move_node(&NodeRef::Category(b), "/A").unwrap(),
        MoveOutcome::Unchanged
    );
    assert_eq!(
        catalog.move_node(&NodeRef::Category(a), "/").unwrap(),
        MoveOutcome::Unchanged
    );
    assert_eq!(
        catalog.move_node(&NodeRef::Item(uid), "/A/B").unwrap(),
        MoveOutcome::Unchanged
    );
    assert_eq!(
        catalog.move_node(&NodeRef::Item(root_uid), "/").unwrap(),
        MoveOutcome::Unchanged
    );

    let after = catalog.export().unwrap();
    assert_eq!(after.categories, before.categories);
    assert_eq!(after.items, before.items);
}

fn test_move_checks_destination_siblings<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let nested = cat(catalog, "Spares", Location::Id(a));
    cat(catalog, "spares", Location::Root);
    let uid = catalog.create_item("Fuse", &Location::Id(a)).unwrap();
    catalog.create_item("FUSE", &Location::Root).unwrap();

    let err = catalog.move_node(&NodeRef::Category(nested), "/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    let err = catalog.move_node(&NodeRef::Item(uid.clone()), "/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);

    assert_eq!(catalog.get_path(&NodeRef::Category(nested)).unwrap(), "/A/Spares");
    assert_eq!(catalog.get_path(&NodeRef::Item(uid)).unwrap(), "/A");
}

fn test_move_errors<S: CatalogStore>(catalog: &mut Catalog<S>) {
    cat(catalog, "A", Location::Root);

    let err = catalog.move_node(&NodeRef::Category(999), "/A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = catalog
        .move_node(&NodeRef::Item("0000000000".into()), "/A")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = catalog.move_node(&NodeRef::Category(1), "A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
    let err = catalog.move_node(&NodeRef::Category(1), "/B").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathNotFound);
}

fn test_delete_empty_subtree<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let b = cat(catalog, "B", Location::Id(a));
    let c = cat(catalog, "C", Location::Id(b));
    let d = cat(catalog, "D", Location::Id(a));
    let keep = cat(catalog, "Keep", Location::Root);

    let mut removed = catalog.delete(&NodeRef::Category(a)).unwrap();
    removed.categories.sort();
    assert_eq!(removed.categories, vec![a, b, c, d]);

    let remaining: Vec<_> = catalog
        .export()
        .unwrap()
        .categories
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(remaining, vec![keep]);

    let err = catalog.delete(&NodeRef::Category(a)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn test_delete_blocked_by_nested_item<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let b = cat(catalog, "B", Location::Id(a));
    let c = cat(catalog, "C", Location::Id(b));
    catalog.create_item("Deep", &Location::Id(c)).unwrap();
    let before = catalog.export().unwrap();

    for id in [a, b, c] {
        let err = catalog.delete(&NodeRef::Category(id)).unwrap_err();
        assert!(matches!(err, CatalogError::NotEmpty));
    }

    let after = catalog.export().unwrap();
    assert_eq!(after.categories, before.categories);
    assert_eq!(after.items, before.items);
}

fn test_delete_item<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let a = cat(catalog, "A", Location::Root);
    let uid = catalog.create_item("Thing", &Location::Id(a)).unwrap();
    catalog.add_image(&uid, image(1)).unwrap();

    let removed = catalog.delete(&NodeRef::Item(uid.clone())).unwrap();
    assert_eq!(removed.items, vec![uid.clone()]);

    let err = catalog.get_item(&uid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = catalog.edit_item(&uid, "Thing", "1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The category is now empty and can go
    catalog.delete(&NodeRef::Category(a)).unwrap();
}

fn test_edit_item<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let uid = catalog.create_item("Widget", &Location::Root).unwrap();
    catalog.create_item("Gadget", &Location::Root).unwrap();

    let item = catalog.edit_item(&uid, "Widget", "2+3*4").unwrap();
    assert_eq!(item.count, 14);
    assert_eq!(catalog.get_item(&uid).unwrap().count, 14);

    // Bad expression keeps the positive current count
    let item = catalog.edit_item(&uid, "Widget XL", "oops").unwrap();
    assert_eq!(item.count, 14);
    assert_eq!(catalog.get_item(&uid).unwrap().name, "Widget XL");

    // Case-only rename of itself is allowed, taking a sibling's name is not
    catalog.edit_item(&uid, "widget xl", "7/2").unwrap();
    assert_eq!(catalog.get_item(&uid).unwrap().count, 4);
    let err = catalog.edit_item(&uid, "GADGET", "1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    let err = catalog.edit_item(&uid, "", "1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidName);

    let stored = catalog.get_item(&uid).unwrap();
    assert_eq!(stored.name, "widget xl");
    assert_eq!(stored.count, 4);
}

fn test_images<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let uid = catalog.create_item("Camera", &Location::Root).unwrap();
    for n in 0..MAX_IMAGES {
        catalog.add_image(&uid, image(n)).unwrap();
    }
    let err = catalog.add_image(&uid, image(9)).unwrap_err();
    assert!(matches!(err, CatalogError::TooManyImages(3)));

    let removed = catalog.remove_image(&uid, 1).unwrap();
    assert_eq!(removed, image(1));
    let item = catalog.get_item(&uid).unwrap();
    assert_eq!(item.images, vec![image(0), image(2)]);

    let err = catalog.remove_image(&uid, 2).unwrap_err();
    assert!(matches!(err, CatalogError::ImageIndex(2)));

    // Editing name/count leaves images alone
    catalog.edit_item(&uid, "Camera", "1").unwrap();
    assert_eq!(catalog.get_item(&uid).unwrap().images.len(), 2);
}

fn test_listing_and_index<S: CatalogStore>(catalog: &mut Catalog<S>) {
    let shelf = cat(catalog, "Shelf", Location::Root);
    cat(catalog, "beta", Location::Id(shelf));
    cat(catalog, "Alpha", Location::Id(shelf));
    catalog.create_item("zeta", &Location::Id(shelf)).unwrap();
    catalog.create_item("Eta", &Location::Id(shelf)).unwrap();
    catalog.create_item("Loose", &Location::Root).unwrap();

    let listing = catalog.list(&path("/Shelf")).unwrap();
    assert_eq!(listing.path, "/Shelf");
    assert_eq!(listing.display, "Root > Shelf");
    assert_eq!(listing.parent_path.as_deref(), Some("/"));
    let names: Vec<_> = listing.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "beta"]);
    let names: Vec<_> = listing.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Eta", "zeta"]);

    let root = catalog.list(&Location::Root).unwrap();
    assert_eq!(root.parent_path, None);
    assert_eq!(root.categories.len(), 1);
    assert_eq!(root.items.len(), 1);

    let index = catalog.search_index().unwrap();
    assert_eq!(index.len(), 6);
    assert!(index.contains(&IndexEntry::Category {
        id: shelf,
        name: "Shelf".into(),
        path: "/Shelf".into(),
    }));
    let kinds: Vec<NodeKind> = index
        .iter()
        .map(|e| match e {
            IndexEntry::Category { .. } => NodeKind::Category,
            IndexEntry::Item { .. } => NodeKind::Item,
        })
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == NodeKind::Item).count(), 3);
}

macro_rules! on_both_backends {
    ($($name:ident),* $(,)?) => {
        mod sqlite {
            use crate::state::library::Library;
            $(
                #[test]
                fn $name() {
                    let mut catalog = super::Catalog::new(Library::open_in_memory().unwrap());
                    super::$name(&mut catalog);
                }
            )*
        }

        mod sheet {
            use crate::state::sheet::SheetStore;
            $(
                #[test]
                fn $name() {
                    let dir = tempfile::tempdir().unwrap();
                    // Low threshold so deletes also exercise compaction
                    let store = SheetStore::open(&dir.path().join("stock.json"), 2).unwrap();
                    let mut catalog = super::Catalog::new(store);
                    super::$name(&mut catalog);
                }
            )*
        }
    };
}

on_both_backends!(
    test_create_and_resolve,
    test_round_trip,
    test_invalid_names_are_rejected,
    test_duplicate_siblings,
    test_missing_parents,
    test_new_item_defaults,
    test_move_scenario,
    test_move_into_own_subtree_fails,
    test_move_to_current_place_is_noop,
    test_move_checks_destination_siblings,
    test_move_errors,
    test_delete_empty_subtree,
    test_delete_blocked_by_nested_item,
    test_delete_item,
    test_edit_item,
    test_images,
    test_listing_and_index,
);

#[test]
fn test_validate_name() {
    assert_eq!(validate_name(" Bolts, M6 ").unwrap(), "Bolts, M6");
    assert_eq!(validate_name("v1.2_final-3").unwrap(), "v1.2_final-3");
    assert!(validate_name(".").is_err());
    assert!(validate_name("...").is_err());
    assert!(validate_name("tab\tname").is_err());
}

#[test]
fn test_generate_uid() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let uid = generate_uid(&mut rng);
        assert_eq!(uid.len(), UID_LEN);
        assert!(uid.bytes().all(|b| b.is_ascii_digit()));
    }
}

fn item_with_uid(uid: &str) -> Item {
    Item {
        uid: uid.to_string(),
        name: format!("Item {}", uid),
        count: 0,
        timestamp: 0,
        category_id: None,
        images: Vec::new(),
    }
}

#[test]
fn test_fresh_uid_draws_again_on_collision() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let rng = StdRng::seed_from_u64(7);
    let mut preview = rng.clone();
    let first = generate_uid(&mut preview);
    let second = generate_uid(&mut preview);
    assert_ne!(first, second);

    // The first draw is taken, so the second one is handed out
    let snapshot = Snapshot::from_rows(Vec::new(), vec![item_with_uid(&first)]);
    let mut rng = rng;
    assert_eq!(fresh_uid(&snapshot, &mut rng).unwrap(), second);
}

#[test]
fn test_fresh_uid_gives_up_when_every_draw_is_taken() {
    use rand::rngs::mock::StepRng;

    // A constant source yields the same uid on every draw
    let stuck = generate_uid(&mut StepRng::new(0, 0));
    let snapshot = Snapshot::from_rows(Vec::new(), vec![item_with_uid(&stuck)]);

    let err = fresh_uid(&snapshot, &mut StepRng::new(0, 0)).unwrap_err();
    assert!(matches!(err, CatalogError::UidSpaceExhausted));
    assert_eq!(err.kind(), ErrorKind::UidSpaceExhausted);
}
