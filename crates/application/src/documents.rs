use rolegate_domain::{Item, Lifecycle, Permission, Role, UserRoleAssignment};

use crate::{CollectionSpec, Document, FieldView, QueryField};

fn lifecycle_view(lifecycle: &Lifecycle, field: QueryField) -> FieldView<'_> {
    match field {
        QueryField::Deleted => FieldView::Bool(lifecycle.is_deleted()),
        QueryField::Provenance => lifecycle
            .provenance()
            .map(|provenance| FieldView::Text(provenance.as_str()))
            .unwrap_or(FieldView::Absent),
        _ => FieldView::Absent,
    }
}

fn id_list<T: AsRef<str>>(ids: &[T]) -> FieldView<'_> {
    FieldView::List(ids.iter().map(AsRef::as_ref).collect())
}

impl Document for Item {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "rbac_item",
        unique_field: QueryField::Name,
        indexed_fields: &[QueryField::Method, QueryField::Path, QueryField::Deleted],
    };

    fn document_id(&self) -> &str {
        self.id().as_str()
    }

    fn unique_key(&self) -> &str {
        self.name()
    }

    fn revision(&self) -> u64 {
        self.lifecycle().revision()
    }

    fn set_revision(&mut self, revision: u64) {
        self.lifecycle_mut().set_revision(revision);
    }

    fn field_view(&self, field: QueryField) -> FieldView<'_> {
        match field {
            QueryField::Name => FieldView::Text(self.name()),
            QueryField::Method => FieldView::Text(self.method()),
            QueryField::Path => FieldView::Text(self.path()),
            _ => lifecycle_view(self.lifecycle(), field),
        }
    }
}

impl Document for Permission {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "rbac_permission",
        unique_field: QueryField::Name,
        indexed_fields: &[QueryField::ItemIds, QueryField::Deleted],
    };

    fn document_id(&self) -> &str {
        self.id().as_str()
    }

    fn unique_key(&self) -> &str {
        self.name()
    }

    fn revision(&self) -> u64 {
        self.lifecycle().revision()
    }

    fn set_revision(&mut self, revision: u64) {
        self.lifecycle_mut().set_revision(revision);
    }

    fn field_view(&self, field: QueryField) -> FieldView<'_> {
        match field {
            QueryField::Name => FieldView::Text(self.name()),
            QueryField::ItemIds => id_list(self.item_ids()),
            _ => lifecycle_view(self.lifecycle(), field),
        }
    }
}

impl Document for Role {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "rbac_role",
        unique_field: QueryField::Name,
        indexed_fields: &[
            QueryField::PermissionIds,
            QueryField::DelegatedRoleIds,
            QueryField::Deleted,
        ],
    };

    fn document_id(&self) -> &str {
        self.id().as_str()
    }

    fn unique_key(&self) -> &str {
        self.name()
    }

    fn revision(&self) -> u64 {
        self.lifecycle().revision()
    }

    fn set_revision(&mut self, revision: u64) {
        self.lifecycle_mut().set_revision(revision);
    }

    fn field_view(&self, field: QueryField) -> FieldView<'_> {
        match field {
            QueryField::Name => FieldView::Text(self.name()),
            QueryField::PermissionIds => id_list(self.permission_ids()),
            QueryField::DelegatedRoleIds => id_list(self.delegated_role_ids()),
            _ => lifecycle_view(self.lifecycle(), field),
        }
    }
}

impl Document for UserRoleAssignment {
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "rbac_user_role",
        unique_field: QueryField::UserId,
        indexed_fields: &[QueryField::RoleIds],
    };

    fn document_id(&self) -> &str {
        self.id().as_str()
    }

    fn unique_key(&self) -> &str {
        self.user_id()
    }

    fn revision(&self) -> u64 {
        UserRoleAssignment::revision(self)
    }

    fn set_revision(&mut self, revision: u64) {
        UserRoleAssignment::set_revision(self, revision);
    }

    fn field_view(&self, field: QueryField) -> FieldView<'_> {
        match field {
            QueryField::UserId => FieldView::Text(self.user_id()),
            QueryField::RoleIds => id_list(self.role_ids()),
            _ => FieldView::Absent,
        }
    }
}
